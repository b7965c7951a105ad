/*
    Rasterizes a scalar field into a contour figure: jet-coloured filled
    bands, black isolines, and an axes frame, on a canvas sized like a
    6.4 x 4.8 inch page at 72 dpi.
*/
use std::path::Path;

use anyhow::{Context, Result};
use bovplot::{contour, Grid};
use cgmath::Vector2;
use image::RgbaImage;
use ndarray::Array2;
use tiny_skia::{
    Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Stroke, Transform,
};

pub mod colormap;

pub use tiny_skia::Pixmap as Canvas;

const DPI: f64 = 72.0;
const FIG_WIDTH_IN: f64 = 6.4;
const FIG_HEIGHT_IN: f64 = 4.8;

const MARGIN_LEFT: f64 = 46.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 18.0;
const MARGIN_BOTTOM: f64 = 34.0;

const FILL_ALPHA: f64 = 0.75;
const TICK_LENGTH: f64 = 5.0;

/// Placement of the data rectangle [0, x_max] x [0, y_max] on the
/// canvas: one scale factor for both axes keeps the aspect ratio, y
/// grows upward.
struct Layout {
    scale: f64,
    left: f64,
    bottom: f64,
    x_max: f64,
    y_max: f64,
}

impl Layout {
    fn fit(width_px: u32, height_px: u32, x_max: f64, y_max: f64) -> Layout {
        let area_w = width_px as f64 - MARGIN_LEFT - MARGIN_RIGHT;
        let area_h = height_px as f64 - MARGIN_TOP - MARGIN_BOTTOM;

        let scale = (area_w / x_max).min(area_h / y_max);
        let plot_w = scale * x_max;
        let plot_h = scale * y_max;

        let left = MARGIN_LEFT + (area_w - plot_w) / 2.0;
        let top = MARGIN_TOP + (area_h - plot_h) / 2.0;

        Layout {
            scale,
            left,
            bottom: top + plot_h,
            x_max,
            y_max,
        }
    }

    fn x_to_canvas(&self, x: f64) -> f64 {
        self.left + x * self.scale
    }

    fn y_to_canvas(&self, y: f64) -> f64 {
        self.bottom - y * self.scale
    }

    fn canvas_to_x(&self, cx: f64) -> f64 {
        (cx - self.left) / self.scale
    }

    fn canvas_to_y(&self, cy: f64) -> f64 {
        (self.bottom - cy) / self.scale
    }
}

/// Render the field as a filled contour plot with isolines and an axes
/// frame. The render is pure: identical inputs yield identical pixels.
pub fn render(field: &Array2<f64>, grid: &Grid) -> Result<Pixmap> {
    let width_px = (FIG_WIDTH_IN * DPI).round() as u32;
    let height_px = (FIG_HEIGHT_IN * DPI).round() as u32;

    let mut pixmap = Pixmap::new(width_px, height_px).context("failed to allocate canvas")?;
    pixmap.fill(Color::WHITE);

    let layout = Layout::fit(width_px, height_px, grid.x_max(), grid.y_max());
    let levels = contour::levels();

    fill_bands(&mut pixmap, field, grid, &layout, &levels);
    stroke_isolines(&mut pixmap, field, grid, &layout, &levels);
    stroke_frame(&mut pixmap, &layout);

    Ok(pixmap)
}

/// Write the canvas as a PNG.
pub fn save_png(pixmap: &Pixmap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let img = RgbaImage::from_raw(pixmap.width(), pixmap.height(), pixmap.data().to_vec())
        .context("canvas buffer size mismatch")?;
    img.save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Pack the canvas as 0RGB u32 pixels for windowed display.
pub fn to_argb(pixmap: &Pixmap) -> Vec<u32> {
    pixmap
        .pixels()
        .iter()
        .map(|p| ((p.red() as u32) << 16) | ((p.green() as u32) << 8) | p.blue() as u32)
        .collect()
}

/// Colour every plot-area pixel by the band its bilinearly sampled
/// value falls in. Values outside the level range leave the background
/// untouched.
fn fill_bands(
    pixmap: &mut Pixmap,
    field: &Array2<f64>,
    grid: &Grid,
    layout: &Layout,
    levels: &[f64],
) {
    let colors = band_colors(levels);
    let width = pixmap.width();
    let height = pixmap.height();
    let pixels = pixmap.pixels_mut();

    for py in 0..height {
        let y = layout.canvas_to_y(py as f64 + 0.5);
        if y < 0.0 || y > layout.y_max {
            continue;
        }
        for px in 0..width {
            let x = layout.canvas_to_x(px as f64 + 0.5);
            if x < 0.0 || x > layout.x_max {
                continue;
            }
            let value = sample(field, grid, x, y);
            if let Some(band) = band_of(levels, value) {
                pixels[(py * width + px) as usize] = colors[band];
            }
        }
    }
}

/// Index of the band `value` falls in. The top level is inclusive so
/// values sitting exactly on it still land in the last band.
fn band_of(levels: &[f64], value: f64) -> Option<usize> {
    let last = levels.len() - 1;
    if !(value >= levels[0] && value <= levels[last]) {
        return None;
    }
    Some(
        levels[1..last]
            .iter()
            .position(|&l| value < l)
            .unwrap_or(last - 1),
    )
}

/// Colour of each band: jet at the band's normalized midpoint, blended
/// at `FILL_ALPHA` over the white background.
fn band_colors(levels: &[f64]) -> Vec<PremultipliedColorU8> {
    let lo = levels[0];
    let hi = levels[levels.len() - 1];
    levels
        .windows(2)
        .map(|pair| {
            let mid = 0.5 * (pair[0] + pair[1]);
            let (r, g, b) = colormap::jet((mid - lo) / (hi - lo));
            let blend = |c: u8| (FILL_ALPHA * c as f64 + (1.0 - FILL_ALPHA) * 255.0).round() as u8;
            PremultipliedColorU8::from_rgba(blend(r), blend(g), blend(b), 255).unwrap()
        })
        .collect()
}

/// Bilinear sample of the field at data coordinates, clamped to the
/// grid.
fn sample(field: &Array2<f64>, grid: &Grid, x: f64, y: f64) -> f64 {
    let (rows, cols) = field.dim();

    let fx = (x / grid.x_spacing()).max(0.0).min((cols - 1) as f64);
    let fy = (y / grid.y_spacing()).max(0.0).min((rows - 1) as f64);

    let c0 = fx as usize;
    let c1 = (c0 + 1).min(cols - 1);
    let r0 = fy as usize;
    let r1 = (r0 + 1).min(rows - 1);

    let s1 = fx - c0 as f64;
    let s0 = 1.0 - s1;
    let t1 = fy - r0 as f64;
    let t0 = 1.0 - t1;

    (field[[r0, c0]] * t0 + field[[r1, c0]] * t1) * s0
        + (field[[r0, c1]] * t0 + field[[r1, c1]] * t1) * s1
}

fn index_to_canvas(p: Vector2<f64>, grid: &Grid, layout: &Layout) -> (f32, f32) {
    let x = p.x * grid.x_spacing();
    let y = p.y * grid.y_spacing();
    (layout.x_to_canvas(x) as f32, layout.y_to_canvas(y) as f32)
}

fn stroke_isolines(
    pixmap: &mut Pixmap,
    field: &Array2<f64>,
    grid: &Grid,
    layout: &Layout,
    levels: &[f64],
) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;

    let mut stroke = Stroke::default();
    stroke.width = 1.0;
    stroke.line_cap = LineCap::Round;
    stroke.line_join = LineJoin::Round;

    for &level in levels {
        let segments = contour::march_squares(field, level);
        for line in contour::connect_segments(&segments) {
            if line.points.len() < 2 {
                continue;
            }
            let mut pb = PathBuilder::new();
            let (cx, cy) = index_to_canvas(line.points[0], grid, layout);
            pb.move_to(cx, cy);
            for &p in &line.points[1..] {
                let (cx, cy) = index_to_canvas(p, grid, layout);
                pb.line_to(cx, cy);
            }
            if line.closed {
                pb.close();
            }
            if let Some(path) = pb.finish() {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }
    }
}

/// Pick a tick spacing that yields roughly five ticks across `range`.
fn tick_interval(range: f64) -> f64 {
    let magnitude = 10f64.powi(range.abs().log10() as i32);
    [magnitude / 2.0, magnitude, magnitude * 2.0]
        .into_iter()
        .min_by_key(|c| ((range / c).round() as i64 - 5).abs())
        .unwrap()
}

fn stroke_frame(pixmap: &mut Pixmap, layout: &Layout) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;

    let mut stroke = Stroke::default();
    stroke.width = 0.75;

    let left = layout.x_to_canvas(0.0);
    let right = layout.x_to_canvas(layout.x_max);
    let top = layout.y_to_canvas(layout.y_max);
    let bottom = layout.y_to_canvas(0.0);

    let mut pb = PathBuilder::new();
    pb.move_to(left as f32, top as f32);
    pb.line_to(left as f32, bottom as f32);
    pb.line_to(right as f32, bottom as f32);
    pb.line_to(right as f32, top as f32);
    pb.close();

    // outward ticks along the bottom and left edges
    let dx = tick_interval(layout.x_max);
    let mut x = 0.0;
    while x <= layout.x_max + 1e-9 {
        let cx = layout.x_to_canvas(x) as f32;
        pb.move_to(cx, bottom as f32);
        pb.line_to(cx, (bottom + TICK_LENGTH) as f32);
        x += dx;
    }
    let dy = tick_interval(layout.y_max);
    let mut y = 0.0;
    while y <= layout.y_max + 1e-9 {
        let cy = layout.y_to_canvas(y) as f32;
        pb.move_to(left as f32, cy);
        pb.line_to((left - TICK_LENGTH) as f32, cy);
        y += dy;
    }

    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

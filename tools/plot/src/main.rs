use anyhow::{anyhow, Result};
use clap::Parser;
use minifb::{Key, Window, WindowOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

const HEADER_FILE: &str = "output.bov";
const OUTPUT_FILE: &str = "output.png";

#[derive(Parser, Debug)]
#[command(version, about = "Plot the diffusion mini-app's BOV output as a contour image")]
struct Args {
    /// Show the result in a popup window in addition to writing the PNG
    #[arg(short, long)]
    show: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let header = bovplot::read_header(HEADER_FILE)?;
    info!("xdim {} ydim {}", header.width, header.height);

    let field = bovplot::read_field(&header)?;
    let grid = bovplot::Grid::new(header.width, header.height);

    let pixmap = figure::render(&field, &grid)?;
    figure::save_png(&pixmap, OUTPUT_FILE)?;

    if args.show {
        show_window(&pixmap)?;
    }
    Ok(())
}

/// Blit the rendered canvas into a window until it is closed or Escape
/// is pressed.
fn show_window(pixmap: &figure::Canvas) -> Result<()> {
    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let buffer = figure::to_argb(pixmap);

    let mut window = Window::new(OUTPUT_FILE, width, height, WindowOptions::default())
        .map_err(|e| anyhow!("failed to open display window: {}", e))?;
    window.set_target_fps(30);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        window
            .update_with_buffer(&buffer, width, height)
            .map_err(|e| anyhow!("failed to update display window: {}", e))?;
    }
    Ok(())
}

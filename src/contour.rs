use cgmath::{vec2, InnerSpace, Vector2};
use ndarray::Array2;

/// Fixed contour thresholds shared by the filled bands and the line
/// overlay: 0.1 steps across [0, 1] with guards at -0.01 and 1.01.
pub fn levels() -> Vec<f64> {
    let mut v = vec![-0.01];
    v.extend((1..10).map(|k| k as f64 / 10.0));
    v.push(1.01);
    v
}

/// An isoline crossing of one grid cell, in grid-index coordinates
/// (x = column, y = row).
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub start: Vector2<f64>,
    pub end: Vector2<f64>,
}

/// A chained contour line.
#[derive(Debug, Clone)]
pub struct Polyline {
    pub points: Vec<Vector2<f64>>,
    pub closed: bool,
}

/// Extract the isoline segments of `field` at `level` by marching
/// squares. Corners at or above `level` count as inside; crossings are
/// placed on the cell edges by linear interpolation.
pub fn march_squares(field: &Array2<f64>, level: f64) -> Vec<Segment> {
    let (rows, cols) = field.dim();
    if rows < 2 || cols < 2 {
        return Vec::new();
    }

    let mut segments = Vec::new();
    for row in 0..rows - 1 {
        for col in 0..cols - 1 {
            let tl = field[[row, col]];
            let tr = field[[row, col + 1]];
            let bl = field[[row + 1, col]];
            let br = field[[row + 1, col + 1]];

            let mut case = 0u8;
            if tl >= level {
                case |= 1;
            }
            if tr >= level {
                case |= 2;
            }
            if br >= level {
                case |= 4;
            }
            if bl >= level {
                case |= 8;
            }

            cell_segments(
                case,
                col as f64,
                row as f64,
                tl,
                tr,
                br,
                bl,
                level,
                &mut segments,
            );
        }
    }
    segments
}

#[allow(clippy::too_many_arguments)]
fn cell_segments(
    case: u8,
    x: f64,
    y: f64,
    tl: f64,
    tr: f64,
    br: f64,
    bl: f64,
    level: f64,
    out: &mut Vec<Segment>,
) {
    let top = || edge_crossing(vec2(x, y), vec2(x + 1.0, y), tl, tr, level);
    let right = || edge_crossing(vec2(x + 1.0, y), vec2(x + 1.0, y + 1.0), tr, br, level);
    let bottom = || edge_crossing(vec2(x, y + 1.0), vec2(x + 1.0, y + 1.0), bl, br, level);
    let left = || edge_crossing(vec2(x, y), vec2(x, y + 1.0), tl, bl, level);

    let mut push = |a: Vector2<f64>, b: Vector2<f64>| out.push(Segment { start: a, end: b });

    match case {
        0 | 15 => {}
        1 | 14 => push(left(), top()),
        2 | 13 => push(top(), right()),
        3 | 12 => push(left(), right()),
        4 | 11 => push(right(), bottom()),
        6 | 9 => push(top(), bottom()),
        7 | 8 => push(left(), bottom()),
        // saddles split into two segments
        5 => {
            push(left(), top());
            push(right(), bottom());
        }
        10 => {
            push(top(), right());
            push(left(), bottom());
        }
        _ => {}
    }
}

fn edge_crossing(a: Vector2<f64>, b: Vector2<f64>, va: f64, vb: f64, level: f64) -> Vector2<f64> {
    if (vb - va).abs() < 1e-12 {
        return (a + b) / 2.0;
    }
    let t = ((level - va) / (vb - va)).clamp(0.0, 1.0);
    a + t * (b - a)
}

/// Chain unordered segments into polylines. Endpoints produced from the
/// same cell edge are bit-identical, so a tiny tolerance suffices.
pub fn connect_segments(segments: &[Segment]) -> Vec<Polyline> {
    const EPS2: f64 = 1e-18;

    let mut used = vec![false; segments.len()];
    let mut polylines = Vec::new();

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let mut points = vec![segments[first].start, segments[first].end];

        loop {
            let tail = *points.last().unwrap();
            let next = segments
                .iter()
                .enumerate()
                .find(|(i, s)| {
                    !used[*i]
                        && ((s.start - tail).magnitude2() < EPS2
                            || (s.end - tail).magnitude2() < EPS2)
                })
                .map(|(i, s)| (i, *s));

            match next {
                Some((i, s)) => {
                    used[i] = true;
                    points.push(if (s.start - tail).magnitude2() < EPS2 {
                        s.end
                    } else {
                        s.start
                    });
                }
                None => break,
            }
        }

        let closed = (points[0] - *points.last().unwrap()).magnitude2() < EPS2;
        polylines.push(Polyline { points, closed });
    }
    polylines
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_levels() {
        let v = levels();
        assert_eq!(v.len(), 11);
        assert_abs_diff_eq!(v[0], -0.01);
        assert_abs_diff_eq!(v[1], 0.1);
        assert_abs_diff_eq!(v[5], 0.5);
        assert_abs_diff_eq!(v[9], 0.9);
        assert_abs_diff_eq!(v[10], 1.01);
    }

    #[test]
    fn test_flat_field_has_no_contours() {
        let field = Array2::from_elem((8, 8), 0.5);
        assert!(march_squares(&field, 0.5).is_empty());
    }

    #[test]
    fn test_level_outside_range() {
        let field = array![[0.2, 0.4], [0.6, 0.8]];
        assert!(march_squares(&field, 1.01).is_empty());
        assert!(march_squares(&field, -0.01).is_empty());
    }

    #[test]
    fn test_edge_crossing_midpoint() {
        let p = edge_crossing(vec2(0.0, 0.0), vec2(1.0, 0.0), 0.0, 10.0, 5.0);
        assert_abs_diff_eq!(p.x, 0.5);
        assert_abs_diff_eq!(p.y, 0.0);
    }

    #[test]
    fn test_edge_crossing_flat_edge_falls_back_to_midpoint() {
        let p = edge_crossing(vec2(0.0, 0.0), vec2(0.0, 1.0), 2.0, 2.0, 2.0);
        assert_abs_diff_eq!(p.x, 0.0);
        assert_abs_diff_eq!(p.y, 0.5);
    }

    #[test]
    fn test_peak_yields_closed_loop() {
        let field = array![
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
        ];
        let segments = march_squares(&field, 0.5);
        assert_eq!(segments.len(), 4);

        let polylines = connect_segments(&segments);
        assert_eq!(polylines.len(), 1);
        assert!(polylines[0].closed);
        assert_eq!(polylines[0].points.len(), 5);
    }

    #[test]
    fn test_open_contour_crosses_the_grid() {
        // left half below, right half above: one vertical isoline
        let field = array![
            [0.0, 1.0],
            [0.0, 1.0],
            [0.0, 1.0],
        ];
        let segments = march_squares(&field, 0.5);
        assert_eq!(segments.len(), 2);

        let polylines = connect_segments(&segments);
        assert_eq!(polylines.len(), 1);
        assert!(!polylines[0].closed);
        for p in &polylines[0].points {
            assert_abs_diff_eq!(p.x, 0.5);
        }
    }
}

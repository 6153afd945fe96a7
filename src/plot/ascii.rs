//! ASCII plotting of a profile for terminal output.
//!
//! Height runs up the page and log10(Ne) across it, the usual ionogram
//! orientation. The grid has a fixed size, which keeps:
//! - quick visual sanity checks readable in any terminal
//! - output deterministic (helpful for golden tests)
//!
//! Plot elements:
//! - profile inside the validity window: `*`
//! - profile outside it: `.`

use crate::domain::{GridRow, ProfileFile};

/// Render a plot for an evaluated grid.
pub fn render_profile_plot(rows: &[GridRow], width: usize, height: usize) -> String {
    let points: Vec<PlotPoint> = rows
        .iter()
        .map(|r| PlotPoint { h: r.height_km, ne: r.ne_m3, valid: r.valid })
        .collect();
    render_plot(&points, width, height)
}

/// Render a plot from a saved profile JSON file.
pub fn render_profile_plot_from_file(file: &ProfileFile, width: usize, height: usize) -> String {
    let points: Vec<PlotPoint> = file
        .grid
        .height_km
        .iter()
        .zip(&file.grid.ne_m3)
        .zip(&file.grid.valid)
        .map(|((&h, &ne), &valid)| PlotPoint { h, ne, valid })
        .collect();
    render_plot(&points, width, height)
}

#[derive(Debug, Clone, Copy)]
struct PlotPoint {
    h: f64,
    ne: f64,
    valid: bool,
}

fn render_plot(points: &[PlotPoint], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    // Non-positive densities have no logarithm; they are left out.
    let mut points: Vec<(f64, f64, bool)> = points
        .iter()
        .filter(|p| p.ne > 0.0 && p.ne.is_finite() && p.h.is_finite())
        .map(|p| (p.h, p.ne.log10(), p.valid))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (x_min, x_max) = range(points.iter().map(|p| p.1)).unwrap_or((8.0, 12.0));
    let (x_min, x_max) = pad_range(x_min, x_max, 0.05);
    let (h_min, h_max) = range(points.iter().map(|p| p.0)).unwrap_or((0.0, 1000.0));

    let mut grid = vec![vec![' '; width]; height];
    let mut prev = None;
    for &(h, x, valid) in &points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(h, h_min, h_max, height);
        let ch = if valid { '*' } else { '.' };
        match prev {
            Some((c0, r0)) => draw_line(&mut grid, c0, r0, col, row, ch),
            None => grid[row][col] = ch,
        }
        prev = Some((col, row));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: log10(Ne)=[{x_min:.2}, {x_max:.2}] m-3 | h=[{h_min:.1}, {h_max:.1}] km\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min.is_finite() && max.is_finite() && max > min { Some((min, max)) } else { None }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(h: f64, h_min: f64, h_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((h - h_min) / (h_max - h_min)).clamp(0.0, 1.0);
    // highest altitude -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham); never overwrites a drawn cell.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y0 as usize).and_then(|r| r.get_mut(x0 as usize)) {
            if *cell == ' ' {
                *cell = ch;
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Segment;

    fn row(h: f64, ne: f64, valid: bool) -> GridRow {
        GridRow { height_km: h, segment: Segment::Topside, ne_m3: ne, valid }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        // Deliberately out of height order: the plot sorts by height.
        let rows = [row(200.0, 1e12, true), row(100.0, 1e10, true), row(300.0, 3e11, true)];
        let txt = render_profile_plot(&rows, 10, 5);
        let expected = concat!(
            "Plot: log10(Ne)=[9.90, 12.10] m-3 | h=[100.0, 300.0] km\n",
            "      *   \n",
            "       ** \n",
            "       ***\n",
            "   ****   \n",
            "***       \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn invalid_heights_use_dots_and_zero_density_is_skipped() {
        let rows = [row(100.0, 1e10, false), row(150.0, 0.0, true), row(300.0, 1e12, true)];
        let txt = render_profile_plot(&rows, 10, 5);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("h=[100.0, 300.0] km"));
        assert_eq!(lines[5].chars().next(), Some('.'));
        assert_eq!(lines[1].chars().last(), Some('*'));
    }

    #[test]
    fn empty_grid_renders_blank_frame() {
        let txt = render_profile_plot(&[], 12, 6);
        assert_eq!(txt.lines().count(), 7);
        assert!(txt.lines().skip(1).all(|l| l.trim().is_empty() && l.len() == 12));
    }
}

//! Terminal rendering of a longitudinal profile on a fixed character grid.
//!
//! Output is deterministic for a given input and size, which keeps the golden
//! tests below stable. Glyphs: `o` for a measured layer, `-` for the fitted
//! Gamma curve, `|` for the column of the fitted shower maximum.

use crate::domain::{FitConfig, FitResult, LayerProfile, ProfileFile};
use crate::fit::normalization_factor;
use crate::models::sample_profile;

/// Render a plot for an in-memory fit result.
pub fn render_fit_plot(
    profile: &LayerProfile,
    result: &FitResult,
    config: &FitConfig,
    width: usize,
    height: usize,
) -> String {
    let points = measured_points(profile, config);
    let (z_min, z_max) = finite_span(points.iter().map(|&(z, _)| z)).unwrap_or((0.0, 1.0));
    let curve: Option<Vec<(f64, f64)>> = result.params.map(|params| {
        let (depths, y) = sample_profile(&params, z_min, z_max, width.max(2) * 2, config.epsilon);
        depths.into_iter().zip(y).collect()
    });
    render_plot(&points, curve.as_deref(), result.shower_max_depth, z_min, z_max, width, height)
}

/// Render a plot from a saved fit report (measured layers + stored model grid).
pub fn render_report_plot(report: &ProfileFile, width: usize, height: usize) -> String {
    let points = measured_points(&report.profile, &report.config);
    let curve: Vec<(f64, f64)> = report
        .grid
        .depth
        .iter()
        .zip(&report.grid.y)
        .map(|(&z, &y)| (z, y))
        .collect();
    let (z_min, z_max) = finite_span(points.iter().chain(&curve).map(|&(z, _)| z)).unwrap_or((0.0, 1.0));
    let curve = (!curve.is_empty()).then_some(curve.as_slice());
    render_plot(&points, curve, report.result.shower_max_depth, z_min, z_max, width, height)
}

/// Measured `(depth, y)` in the units the fit ran in.
fn measured_points(profile: &LayerProfile, config: &FitConfig) -> Vec<(f64, f64)> {
    let y = profile.select(config.y_selector);
    let norm = normalization_factor(&y, config.normalize);
    profile.depths().into_iter().zip(y).map(|(z, v)| (z, v / norm)).collect()
}

fn render_plot(
    points: &[(f64, f64)],
    curve_points: Option<&[(f64, f64)]>,
    marker: Option<f64>,
    z_min: f64,
    z_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = padded_y_range(points, curve_points);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first, then the marker in the gaps, so points overlay both.
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, z_min, z_max, y_min, y_max);
    }
    let marker = marker.filter(|m| m.is_finite() && *m >= z_min && *m <= z_max);
    if let Some(m) = marker {
        let x = map_x(m, z_min, z_max, width);
        for row in grid.iter_mut() {
            if row[x] == ' ' {
                row[x] = '|';
            }
        }
    }
    for &(z, y) in points {
        if !y.is_finite() {
            continue;
        }
        let x = map_x(z, z_min, z_max, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!("Plot: depth=[{z_min:.2}, {z_max:.2}] | y=[{y_min:.2}, {y_max:.2}]"));
    if let Some(m) = marker {
        out.push_str(&format!(" | shower max={m:.2}"));
    }
    out.push('\n');

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Smallest and largest finite value, or `None` when they do not span a range.
fn finite_span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (hi > lo).then_some((lo, hi))
}

/// Value range over points and curve, widened by 5 % on each side.
fn padded_y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> (f64, f64) {
    let curve = curve.unwrap_or(&[]);
    let (lo, hi) = finite_span(points.iter().chain(curve).map(|&(_, y)| y)).unwrap_or((0.0, 1.0));
    let pad = ((hi - lo) * 0.05).max(1e-12);
    (lo - pad, hi + pad)
}

fn map_x(z: f64, z_min: f64, z_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((z - z_min) / (z_max - z_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], z_min: f64, z_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(z, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let x = map_x(z, z_min, z_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Bresenham segment; only blank cells are overwritten.
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
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
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

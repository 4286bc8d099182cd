//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a model's simulated response
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - measured output: `o`
//! - open-loop simulated output: `-` line

/// Render measured vs simulated output against time.
///
/// Both series are indexed by sample; sample `k` sits at `t = k * sampling_interval`.
pub fn render_response_plot(
    measured: &[f64],
    simulated: &[f64],
    sampling_interval: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let n = measured.len().max(simulated.len());
    let t_min = 0.0;
    let t_max = (n.saturating_sub(1) as f64 * sampling_interval).max(sampling_interval);

    let (y_min, y_max) = y_range(measured, simulated).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so measured points overlay it.
    let curve: Vec<(f64, f64)> = simulated
        .iter()
        .enumerate()
        .filter(|(_, y)| y.is_finite())
        .map(|(k, &y)| (k as f64 * sampling_interval, y))
        .collect();
    draw_curve(&mut grid, &curve, t_min, t_max, y_min, y_max);

    for (k, &y) in measured.iter().enumerate() {
        if !y.is_finite() {
            continue;
        }
        let x = map_x(k as f64 * sampling_interval, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.3}, {t_max:.3}] s | y=[{y_min:.4}, {y_max:.4}] | o measured, - simulated\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn y_range(measured: &[f64], simulated: &[f64]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &y in measured.iter().chain(simulated).filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top (largest y).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.is_empty() {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, row, '-'),
            None => grid[row][x] = '-',
        }
        prev = Some((x, row));
    }
}

/// Integer line drawing (Bresenham).
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
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
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

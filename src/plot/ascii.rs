//! ASCII charts for terminal output.
//!
//! Fixed-size character grids, deterministic so output can be compared
//! verbatim in tests:
//! - a line chart of a daily series (`*` for points, `-` between them)
//! - a horizontal bar chart of grouped values

use chrono::NaiveDate;

use crate::data::GroupValue;

/// Render a date-indexed series as a line chart.
pub fn render_line_chart(series: &[(NaiveDate, u64)], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(3);

    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return "(no data)\n".to_string();
    };
    let (x_min, x_max) = (0.0, (series.len().max(2) - 1) as f64);
    let (y_min, y_max) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v as f64), hi.max(*v as f64))
        });
    let (y_min, y_max) = if y_max > y_min { (y_min, y_max) } else { (y_min - 1.0, y_max + 1.0) };

    let mut grid = vec![vec![' '; width]; height];
    let mut prev = None;
    for (i, (_, v)) in series.iter().enumerate() {
        let x = map_x(i as f64, x_min, x_max, width);
        let y = map_y(*v as f64, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(&mut grid, x0, y0, x, y, '-');
        }
        prev = Some((x, y));
    }
    // Points go on top of the connecting segments.
    for (i, (_, v)) in series.iter().enumerate() {
        let x = map_x(i as f64, x_min, x_max, width);
        let y = map_y(*v as f64, y_min, y_max, height);
        grid[y][x] = '*';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Units sold per day: {} .. {} | y=[{y_min:.0}, {y_max:.0}]\n",
        first.0, last.0
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

/// Render groups as horizontal bars scaled to the largest value.
pub fn render_bar_chart(groups: &[GroupValue], width: usize, show_share: bool) -> String {
    if groups.is_empty() {
        return "(no data)\n".to_string();
    }
    let label_width = groups.iter().map(|g| g.key.chars().count()).max().unwrap_or(0);
    let max = groups.iter().map(|g| g.value).fold(0.0, f64::max);
    let width = width.max(1);

    let mut out = String::new();
    for g in groups {
        let len = if max > 0.0 {
            ((g.value / max) * width as f64).round() as usize
        } else {
            0
        };
        let mut line = format!("{:<label_width$} |{} {:.1}", g.key, "#".repeat(len), g.value);
        if show_share {
            line.push_str(&format!(" ({:.1}%)", g.share * 100.0));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
            .filter(|c| **c == ' ')
        {
            *cell = ch;
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

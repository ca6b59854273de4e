//! Plotters-powered daily sales chart widget for Ratatui.
//!
//! Rendered into the Ratatui buffer through `plotters-ratatui-backend`.

use chrono::NaiveDate;
use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only line chart description. Series and bounds are computed by the
/// caller; `render()` only draws.
pub struct DailySalesChart<'a> {
    /// `(day number from CE, units sold)` pairs, date ascending.
    pub series: &'a [(f64, f64)],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl<'a> DailySalesChart<'a> {
    /// Axis bounds for `series`, with the y range padded by 5%.
    pub fn bounds_for(series: &[(f64, f64)]) -> Option<([f64; 2], [f64; 2])> {
        let (first, last) = (series.first()?, series.last()?);
        let (mut y0, mut y1) = series
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
        if !(y0.is_finite() && y1.is_finite()) {
            return None;
        }
        if y1 <= y0 {
            y0 -= 1.0;
            y1 += 1.0;
        }
        let pad = (y1 - y0) * 0.05;
        let (x0, mut x1) = (first.0, last.0);
        if x1 <= x0 {
            x1 = x0 + 1.0;
        }
        Some(([x0, x1], [(y0 - pad).max(0.0), y1 + pad]))
    }
}

/// Day number (from CE) used as the chart's x coordinate.
pub fn date_to_x(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    f64::from(date.num_days_from_ce())
}

fn fmt_date_tick(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%m-%d").to_string())
        .unwrap_or_default()
}

fn fmt_units_tick(v: f64) -> String {
    format!("{v:.0}")
}

impl<'a> Widget for DailySalesChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters cannot lay out a mesh in a tiny area; show a hint instead.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc("date")
                .y_desc("units sold")
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| fmt_date_tick(*v))
                .y_label_formatter(&|v| fmt_units_tick(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let line_color = RGBColor(0, 255, 255);
            chart.draw_series(LineSeries::new(self.series.iter().copied(), &line_color))?;
            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_the_series_with_padding() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = vec![(date_to_x(d), 100.0), (date_to_x(d) + 2.0, 300.0)];
        let (x, y) = DailySalesChart::bounds_for(&series).unwrap();
        assert_eq!(x, [date_to_x(d), date_to_x(d) + 2.0]);
        assert!((y[0] - 90.0).abs() < 1e-9);
        assert!((y[1] - 310.0).abs() < 1e-9);
        assert_eq!(fmt_date_tick(date_to_x(d)), "01-01");
        assert!(DailySalesChart::bounds_for(&[]).is_none());
    }
}

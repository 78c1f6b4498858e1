//! R² of the lagged regressions against forecast horizon.

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::analyzers::types::LagFit;
use crate::figures::Figure;
use crate::figures::layout::{TickedAxis, symmetric_ticks};

const LINE_COLOR: RGBColor = RGBColor(0x37, 0x7e, 0xb8);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LagOptions {
    /// Draw the "Forecast (days)" axis description.
    pub x_label: bool,
    /// Draw the "r²" axis description.
    pub y_label: bool,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LagFigure {
    /// `(forecast days, R²)` sorted by forecast.
    pub points: Vec<(f64, f64)>,
    pub max_lag: i64,
    pub options: LagOptions,
}

impl LagFigure {
    pub fn new(fits: &[LagFit], max_lag: i64, options: LagOptions) -> Self {
        let mut points: Vec<(f64, f64)> = fits
            .iter()
            .map(|fit| (fit.forecast_days() as f64, fit.r_squared))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            points,
            max_lag: max_lag.max(1),
            options,
        }
    }
}

impl Figure for LagFigure {
    fn size_inches(&self) -> (f64, f64) {
        (3.35, 2.0)
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let limit = self.max_lag as f64;
        let ticks = symmetric_ticks(self.max_lag, 7);

        let mut chart = ChartBuilder::on(root)
            .margin(5)
            .x_label_area_size(if self.options.x_label { 30 } else { 18 })
            .y_label_area_size(if self.options.y_label { 36 } else { 26 })
            .build_cartesian_2d(TickedAxis::new(-limit..limit, ticks.clone()), 0.0..1.0)?;

        let day_label = |x: &f64| format!("{x:.0}");
        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .x_labels(ticks.len().max(1))
            .x_label_formatter(&day_label)
            .label_style(("sans-serif", 10))
            .axis_desc_style(("sans-serif", 11));
        if self.options.x_label {
            mesh.x_desc("Forecast (days)");
        }
        if self.options.y_label {
            mesh.y_desc("r²");
        }
        mesh.draw()?;

        chart.draw_series(LineSeries::new(
            self.points.iter().copied(),
            LINE_COLOR.stroke_width(2),
        ))?;

        // dashed marker at a zero-day forecast
        chart.draw_series((0..13).map(|i| {
            let y = i as f64 * 0.08;
            PathElement::new(vec![(0.0, y), (0.0, (y + 0.04).min(1.0))], BLACK.stroke_width(1))
        }))?;

        if let Some(title) = &self.options.title {
            let style = TextStyle::from(("sans-serif", 12).into_font().style(FontStyle::Bold))
                .pos(Pos::new(HPos::Right, VPos::Bottom));
            chart.draw_series(std::iter::once(Text::new(
                title.clone(),
                (-limit + 0.96 * 2.0 * limit, 0.07),
                style,
            )))?;
        }

        Ok(())
    }
}

//! Incidence figure: ground truth, offset-0 model, and top article accesses.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;
use plotters::style::text_anchor::Pos;

use crate::analyzers::aggregate::normalized_series;
use crate::analyzers::types::{
    AggregatePeriod, ArticleCorrelation, GroundTruth, LagFit, WikiCounts,
};
use crate::analyzers::utility::scale_to_max;
use crate::figures::Figure;
use crate::figures::layout::{
    LegendLocation, TickedAxis, TitleLocation, fractional_year, year_ticks,
};

/// Articles drawn behind the ground truth.
pub const PLOTTED_ARTICLES: usize = 5;

const OFFICIAL_COLOR: RGBColor = RGBColor(0x37, 0x7e, 0xb8);
const MODEL_COLOR: RGBColor = RGBColor(0xa6, 0x56, 0x28);
const ARTICLE_COLOR: RGBColor = RGBColor(0xbf, 0xbf, 0xbf);

#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceOptions {
    pub legend: Option<LegendLocation>,
    pub title: Option<String>,
    pub title_location: TitleLocation,
    /// Draw the "Date" axis description.
    pub x_label: bool,
    pub y1_label: String,
    /// Blank the label of the final year tick.
    pub strip_last_x_label: bool,
}

impl Default for IncidenceOptions {
    fn default() -> Self {
        Self {
            legend: None,
            title: None,
            title_location: TitleLocation::default(),
            x_label: false,
            y1_label: "Disease Incidence".to_string(),
            strip_last_x_label: false,
        }
    }
}

/// Data behind the incidence figure, already aligned and scaled.
#[derive(Debug, Clone)]
pub struct IncidenceFigure {
    /// Each ranked article's offset-0 ratios scaled so its peak is 1.
    pub articles: Vec<Vec<(NaiveDate, f64)>>,
    pub ground_truth: Vec<(NaiveDate, f64)>,
    pub model: Vec<(NaiveDate, f64)>,
    pub options: IncidenceOptions,
}

impl IncidenceFigure {
    /// Collects the plotted series from the ranking and the offset-0 fit.
    ///
    /// The ground-truth point without a window (the last one when counts are
    /// attributed forwards, the first when backwards) is left out.
    pub fn build(
        counts: &WikiCounts,
        truth: &GroundTruth,
        ranking: &[ArticleCorrelation],
        fit: &LagFit,
        period: AggregatePeriod,
        options: IncidenceOptions,
    ) -> Result<Self> {
        let mut articles = Vec::new();
        for entry in ranking.iter().take(PLOTTED_ARTICLES) {
            let series = normalized_series(counts, truth, &entry.article, 0, period)
                .with_context(|| format!("normalizing {} for the incidence figure", entry.article))?;
            let scaled = scale_to_max(&series.ratios(), &[]);
            articles.push(series.dates().into_iter().zip(scaled).collect());
        }

        let mut ground_truth: Vec<(NaiveDate, f64)> = truth.iter().collect();
        match period {
            AggregatePeriod::After => {
                ground_truth.pop();
            }
            AggregatePeriod::Before => {
                if !ground_truth.is_empty() {
                    ground_truth.remove(0);
                }
            }
        }

        let model = fit
            .dates
            .iter()
            .copied()
            .zip(fit.fitted.iter().copied())
            .collect();

        Ok(Self {
            articles,
            ground_truth,
            model,
            options,
        })
    }

    fn x_range(&self) -> (f64, f64) {
        let years = self
            .articles
            .iter()
            .flatten()
            .chain(&self.ground_truth)
            .chain(&self.model)
            .map(|(d, _)| fractional_year(*d));
        let (lo, hi) = years.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
        if lo.is_finite() && hi > lo {
            (lo, hi)
        } else if lo.is_finite() {
            (lo - 0.5, lo + 0.5)
        } else {
            (0.0, 1.0)
        }
    }

    fn y_max(&self) -> f64 {
        let max = self
            .ground_truth
            .iter()
            .chain(&self.model)
            .map(|(_, v)| *v)
            .fold(0.0, f64::max);
        if max > 0.0 { max * 1.05 } else { 1.0 }
    }
}

impl Figure for IncidenceFigure {
    fn size_inches(&self) -> (f64, f64) {
        (6.3, 1.8)
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let (x0, x1) = self.x_range();
        let y_max = self.y_max();
        let years = year_ticks(x0, x1);
        let last_year = years.last().copied();

        let mut chart = ChartBuilder::on(root)
            .margin(5)
            .x_label_area_size(if self.options.x_label { 28 } else { 16 })
            .y_label_area_size(40)
            .right_y_label_area_size(24)
            .build_cartesian_2d(TickedAxis::new(x0..x1, years.clone()), 0.0..y_max)?
            .set_secondary_coord(
                TickedAxis::new(x0..x1, years.clone()),
                TickedAxis::new(0.0..1.05, vec![0.0, 1.0]),
            );

        let strip_last = self.options.strip_last_x_label;
        let year_label = |x: &f64| {
            if strip_last && Some(*x) == last_year {
                String::new()
            } else {
                format!("{x:.0}")
            }
        };
        let share_label = |v: &f64| format!("{v:.0}");

        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .x_labels(years.len().max(1))
            .x_label_formatter(&year_label)
            .y_desc(self.options.y1_label.as_str())
            .label_style(("sans-serif", 10))
            .axis_desc_style(("sans-serif", 9));
        if self.options.x_label {
            mesh.x_desc("Date");
        }
        mesh.draw()?;

        chart
            .configure_secondary_axes()
            .y_desc("Article accesses")
            .y_label_formatter(&share_label)
            .label_style(("sans-serif", 9))
            .axis_desc_style(("sans-serif", 9))
            .draw()?;

        for (i, series) in self.articles.iter().enumerate() {
            let anno = chart.draw_secondary_series(LineSeries::new(
                series.iter().map(|(d, v)| (fractional_year(*d), *v)),
                ARTICLE_COLOR.stroke_width(1),
            ))?;
            if i == 0 {
                anno.label("Wikipedia").legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 14, y)], ARTICLE_COLOR.stroke_width(1))
                });
            }
        }

        chart
            .draw_series(LineSeries::new(
                self.ground_truth
                    .iter()
                    .map(|(d, v)| (fractional_year(*d), *v)),
                OFFICIAL_COLOR.stroke_width(2),
            ))?
            .label("Official")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 14, y)], OFFICIAL_COLOR.stroke_width(2))
            });

        chart
            .draw_series(LineSeries::new(
                self.model.iter().map(|(d, v)| (fractional_year(*d), *v)),
                MODEL_COLOR.stroke_width(2),
            ))?
            .label("Model")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 14, y)], MODEL_COLOR.stroke_width(2))
            });

        if let Some(legend) = self.options.legend {
            chart
                .configure_series_labels()
                .position(legend.position())
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .label_font(("sans-serif", 10))
                .draw()?;
        }

        if let Some(title) = &self.options.title {
            let (fx, fy, h, v) = self.options.title_location.anchor();
            let style = TextStyle::from(("sans-serif", 10).into_font().style(FontStyle::Bold))
                .pos(Pos::new(h, v));
            chart.draw_series(std::iter::once(Text::new(
                title.clone(),
                (x0 + fx * (x1 - x0), fy * y_max),
                style,
            )))?;
        }

        Ok(())
    }
}

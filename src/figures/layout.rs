//! Placement presets and axis helpers shared by both figures.

use chrono::{Datelike, NaiveDate};
use plotters::chart::SeriesLabelPosition;
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::style::text_anchor::{HPos, VPos};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Normalizes `"Upper Left"`, `"upper-left"` and `"upper_left"` alike.
fn normalize(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Corner or edge of the incidence plot where the title is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleLocation {
    LowerCenter,
    LowerLeft,
    LowerRight,
    UpperCenter,
    #[default]
    UpperLeft,
    UpperRight,
}

impl TitleLocation {
    /// Anchor as fractions of the plotting area (x from the left, y from the
    /// bottom) plus the text alignment at that point.
    pub fn anchor(self) -> (f64, f64, HPos, VPos) {
        match self {
            Self::LowerCenter => (0.5, 0.001, HPos::Center, VPos::Bottom),
            Self::LowerLeft => (0.005, 0.001, HPos::Left, VPos::Bottom),
            Self::LowerRight => (0.995, 0.001, HPos::Right, VPos::Bottom),
            Self::UpperCenter => (0.5, 0.99, HPos::Center, VPos::Top),
            Self::UpperLeft => (0.005, 0.99, HPos::Left, VPos::Top),
            Self::UpperRight => (0.995, 0.99, HPos::Right, VPos::Top),
        }
    }
}

impl FromStr for TitleLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "lower center" => Ok(Self::LowerCenter),
            "lower left" => Ok(Self::LowerLeft),
            "lower right" => Ok(Self::LowerRight),
            "upper center" => Ok(Self::UpperCenter),
            "upper left" => Ok(Self::UpperLeft),
            "upper right" => Ok(Self::UpperRight),
            _ => Err(format!("unknown title location {s:?}")),
        }
    }
}

impl fmt::Display for TitleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LowerCenter => "lower center",
            Self::LowerLeft => "lower left",
            Self::LowerRight => "lower right",
            Self::UpperCenter => "upper center",
            Self::UpperLeft => "upper left",
            Self::UpperRight => "upper right",
        };
        f.write_str(name)
    }
}

/// Legend placement, accepting matplotlib's location names and codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendLocation {
    UpperLeft,
    UpperCenter,
    UpperRight,
    CenterLeft,
    Center,
    CenterRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl LegendLocation {
    pub fn position(self) -> SeriesLabelPosition {
        match self {
            Self::UpperLeft => SeriesLabelPosition::UpperLeft,
            Self::UpperCenter => SeriesLabelPosition::UpperMiddle,
            Self::UpperRight => SeriesLabelPosition::UpperRight,
            Self::CenterLeft => SeriesLabelPosition::MiddleLeft,
            Self::Center => SeriesLabelPosition::MiddleMiddle,
            Self::CenterRight => SeriesLabelPosition::MiddleRight,
            Self::LowerLeft => SeriesLabelPosition::LowerLeft,
            Self::LowerCenter => SeriesLabelPosition::LowerMiddle,
            Self::LowerRight => SeriesLabelPosition::LowerRight,
        }
    }
}

impl FromStr for LegendLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            // no automatic placement, so "best" falls back to matplotlib's usual pick
            "best" | "0" | "upper right" | "1" => Ok(Self::UpperRight),
            "upper left" | "2" => Ok(Self::UpperLeft),
            "lower left" | "3" => Ok(Self::LowerLeft),
            "lower right" | "4" => Ok(Self::LowerRight),
            "right" | "5" | "center right" | "7" => Ok(Self::CenterRight),
            "center left" | "6" => Ok(Self::CenterLeft),
            "lower center" | "8" => Ok(Self::LowerCenter),
            "upper center" | "9" => Ok(Self::UpperCenter),
            "center" | "10" => Ok(Self::Center),
            _ => Err(format!("unknown legend location {s:?}")),
        }
    }
}

/// Calendar date as a fractional year, e.g. 2013-07-02 is roughly 2013.5.
pub fn fractional_year(date: NaiveDate) -> f64 {
    let year = date.year();
    let days = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    year as f64 + date.ordinal0() as f64 / days
}

/// Whole years inside `[start, end]`, used as the date axis tick positions.
pub fn year_ticks(start: f64, end: f64) -> Vec<f64> {
    if !(start.is_finite() && end.is_finite()) || start > end {
        return Vec::new();
    }
    let first = start.ceil() as i64;
    let last = end.floor() as i64;
    (first..=last).map(|y| y as f64).collect()
}

/// Multiples of `step` inside `[-limit, limit]`.
pub fn symmetric_ticks(limit: i64, step: i64) -> Vec<f64> {
    if step <= 0 || limit < 0 {
        return Vec::new();
    }
    let reach = limit / step;
    (-reach..=reach).map(|i| (i * step) as f64).collect()
}

/// A float axis whose ticks sit at fixed positions instead of plotters' round numbers.
///
/// When the mesh asks for fewer points than there are ticks, every n-th tick is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct TickedAxis {
    start: f64,
    end: f64,
    ticks: Vec<f64>,
}

impl TickedAxis {
    pub fn new(range: Range<f64>, ticks: Vec<f64>) -> Self {
        let ticks = ticks
            .into_iter()
            .filter(|t| *t >= range.start && *t <= range.end)
            .collect();
        Self {
            start: range.start,
            end: range.end,
            ticks,
        }
    }

    pub fn ticks(&self) -> &[f64] {
        &self.ticks
    }
}

impl Ranged for TickedAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let span = self.end - self.start;
        if span == 0.0 {
            return (limit.0 + limit.1) / 2;
        }
        let fraction = (value - self.start) / span;
        limit.0 + ((limit.1 - limit.0) as f64 * fraction + 1e-3).floor() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        let max = hint.max_num_points();
        if max == 0 {
            return Vec::new();
        }
        let stride = self.ticks.len().div_ceil(max).max(1);
        self.ticks.iter().copied().step_by(stride).collect()
    }

    fn range(&self) -> Range<f64> {
        self.start..self.end
    }
}

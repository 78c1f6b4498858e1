//! Data types used by the analysis pipeline.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};

/// Identifies one article column of the Wikipedia counts CSV.
///
/// Ordering is lexicographic on `(project, article)` and doubles as the
/// ranking tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArticleKey {
    pub project: String,
    pub article: String,
}

impl ArticleKey {
    pub fn new(project: impl Into<String>, article: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            article: article.into(),
        }
    }
}

impl fmt::Display for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.article)
    }
}

/// Daily access counts. Missing days read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountSeries {
    counts: BTreeMap<NaiveDate, u64>,
}

impl CountSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` to the running total for `date`, creating the day if needed.
    pub fn add(&mut self, date: NaiveDate, count: u64) {
        *self.counts.entry(date).or_insert(0) += count;
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.counts.contains_key(&date)
    }

    pub fn get(&self, date: NaiveDate) -> u64 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    /// Latest day with a recorded count.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.counts.keys().next_back().copied()
    }

    /// Sum over the half-open calendar range `[start, end)`.
    pub fn sum_range(&self, start: NaiveDate, end: NaiveDate) -> u64 {
        if start >= end {
            return 0;
        }
        self.counts.range(start..end).map(|(_, c)| *c).sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.counts.iter().map(|(d, c)| (*d, *c))
    }
}

impl FromIterator<(NaiveDate, u64)> for CountSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, u64)>>(iter: I) -> Self {
        let mut series = CountSeries::new();
        for (date, count) in iter {
            series.add(date, count);
        }
        series
    }
}

/// Every article series and every whole-project total loaded from the counts CSV.
#[derive(Debug, Clone, Default)]
pub struct WikiCounts {
    articles: BTreeMap<ArticleKey, CountSeries>,
    project_totals: BTreeMap<String, CountSeries>,
}

impl WikiCounts {
    pub fn new(
        articles: BTreeMap<ArticleKey, CountSeries>,
        project_totals: BTreeMap<String, CountSeries>,
    ) -> Self {
        Self {
            articles,
            project_totals,
        }
    }

    pub fn article(&self, key: &ArticleKey) -> Option<&CountSeries> {
        self.articles.get(key)
    }

    pub fn project_total(&self, project: &str) -> Option<&CountSeries> {
        self.project_totals.get(project)
    }

    /// Article keys in lexicographic order.
    pub fn article_keys(&self) -> impl Iterator<Item = &ArticleKey> {
        self.articles.keys()
    }

    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    pub fn project_count(&self) -> usize {
        self.project_totals.len()
    }
}

/// The ground-truth series that article accesses are correlated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundTruth {
    values: BTreeMap<NaiveDate, f64>,
}

impl GroundTruth {
    /// Builds the series, rejecting any date that appears twice.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut values = BTreeMap::new();
        for (date, value) in entries {
            match values.entry(date) {
                Entry::Occupied(_) => return Err(AnalysisError::DuplicateDate(date)),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Which reference date absorbs the counts of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregatePeriod {
    /// `[d, next)` is attributed to `next`.
    Before,
    /// `[d, next)` is attributed to `d`.
    #[default]
    After,
}

impl FromStr for AggregatePeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            other => Err(format!(
                "unknown aggregate period {other:?} (expected before or after)"
            )),
        }
    }
}

impl fmt::Display for AggregatePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// One window of a normalized series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub article_count: u64,
    pub total_count: u64,
    pub ratio: f64,
}

/// An article's windowed share of project traffic, keyed by shifted date.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    pub(crate) offset: i64,
    pub(crate) points: BTreeMap<NaiveDate, NormalizedPoint>,
}

impl NormalizedSeries {
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn get(&self, date: NaiveDate) -> Option<&NormalizedPoint> {
        self.points.get(&date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.keys().copied().collect()
    }

    pub fn ratios(&self) -> Vec<f64> {
        self.points.values().map(|p| p.ratio).collect()
    }

    /// The reference date each point lines up with (`date - offset`).
    pub fn reference_dates(&self) -> Vec<NaiveDate> {
        self.points
            .keys()
            .filter_map(|d| shift_date(*d, -self.offset))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &NormalizedPoint)> {
        self.points.iter().map(|(d, p)| (*d, p))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Pearson correlation of one article with the ground truth at offset 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleCorrelation {
    pub article: ArticleKey,
    pub correlation: f64,
}

/// Lagged regression fit for a single offset.
#[derive(Debug, Clone, Serialize)]
pub struct LagFit {
    pub offset: i64,
    /// Shifted (article-side) dates of the observations.
    pub dates: Vec<NaiveDate>,
    /// Intercept first, then one coefficient per ranked article.
    pub coefficients: Vec<f64>,
    pub fitted: Vec<f64>,
    pub r_squared: f64,
    /// Numerical rank of the design matrix; below `coefficients.len()` when
    /// some regressors are linearly dependent.
    pub rank: usize,
}

impl LagFit {
    pub fn forecast_days(&self) -> i64 {
        -self.offset
    }

    pub fn observations(&self) -> usize {
        self.fitted.len()
    }
}

pub(crate) fn shift_date(date: NaiveDate, offset: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_count_series_sums_half_open_range() {
        let series: CountSeries = (1..=5).map(|i| (d(2020, 1, i), i as u64)).collect();

        assert_eq!(series.sum_range(d(2020, 1, 2), d(2020, 1, 4)), 2 + 3);
        assert_eq!(series.sum_range(d(2020, 1, 4), d(2020, 1, 4)), 0);
        assert_eq!(series.sum_range(d(2019, 12, 1), d(2021, 1, 1)), 15);
        assert_eq!(series.last_date(), Some(d(2020, 1, 5)));
        assert_eq!(CountSeries::new().last_date(), None);
    }

    #[test]
    fn test_count_series_add_accumulates() {
        let mut series = CountSeries::new();
        series.add(d(2020, 1, 1), 3);
        series.add(d(2020, 1, 1), 4);

        assert_eq!(series.get(d(2020, 1, 1)), 7);
        assert_eq!(series.get(d(2020, 1, 2)), 0);
        assert!(!series.contains(d(2020, 1, 2)));
    }

    #[test]
    fn test_ground_truth_rejects_duplicate_dates() {
        let result = GroundTruth::from_entries(vec![
            (d(2020, 1, 1), 1.0),
            (d(2020, 1, 8), 2.0),
            (d(2020, 1, 1), 3.0),
        ]);

        match result {
            Err(AnalysisError::DuplicateDate(date)) => assert_eq!(date, d(2020, 1, 1)),
            other => panic!("expected duplicate date error, got {other:?}"),
        }
    }

    #[test]
    fn test_aggregate_period_parsing() {
        assert_eq!("before".parse::<AggregatePeriod>(), Ok(AggregatePeriod::Before));
        assert_eq!("AFTER".parse::<AggregatePeriod>(), Ok(AggregatePeriod::After));
        assert!("during".parse::<AggregatePeriod>().is_err());
        assert_eq!(AggregatePeriod::default(), AggregatePeriod::After);
    }

    #[test]
    fn test_reference_dates_undo_offset() {
        let mut points = BTreeMap::new();
        points.insert(
            d(2020, 1, 3),
            NormalizedPoint {
                article_count: 1,
                total_count: 2,
                ratio: 0.5,
            },
        );
        let series = NormalizedSeries { offset: 2, points };

        assert_eq!(series.reference_dates(), vec![d(2020, 1, 1)]);
    }
}

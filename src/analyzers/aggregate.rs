use crate::analyzers::types::{
    AggregatePeriod, ArticleKey, CountSeries, GroundTruth, NormalizedPoint, NormalizedSeries,
    WikiCounts, shift_date,
};
use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;

/// Aggregates an article's daily counts into the windows between consecutive
/// ground-truth dates shifted by `offset` days, normalized by project traffic.
///
/// Only shifted dates that the article series actually contains delimit
/// windows, plus the day right after its last recorded day, which can close
/// the final window. Each window `[start, end)` sums the article's and the project's
/// daily counts over every calendar day it spans and is keyed by `start`
/// ([`AggregatePeriod::After`]) or `end` ([`AggregatePeriod::Before`]). A
/// window with no project traffic gets a ratio of zero.
///
/// # Errors
///
/// [`AnalysisError::UnknownArticle`] if `key` is not in `counts`, and
/// [`AnalysisError::InsufficientDates`] if fewer than two shifted dates
/// qualify as boundaries.
pub fn normalized_series(
    counts: &WikiCounts,
    truth: &GroundTruth,
    key: &ArticleKey,
    offset: i64,
    period: AggregatePeriod,
) -> Result<NormalizedSeries> {
    let article = counts
        .article(key)
        .ok_or_else(|| AnalysisError::UnknownArticle(key.clone()))?;
    let empty = CountSeries::new();
    let totals = counts.project_total(&key.project).unwrap_or(&empty);

    let closing = article.last_date().and_then(|last| shift_date(last, 1));
    let boundaries: Vec<NaiveDate> = truth
        .dates()
        .filter_map(|d| shift_date(d, offset))
        .filter(|d| article.contains(*d) || Some(*d) == closing)
        .collect();

    if boundaries.len() < 2 {
        return Err(AnalysisError::InsufficientDates {
            article: key.clone(),
            offset,
            found: boundaries.len(),
        });
    }

    let mut points = BTreeMap::new();
    for window in boundaries.windows(2) {
        let (start, end) = (window[0], window[1]);
        let article_count = article.sum_range(start, end);
        let total_count = totals.sum_range(start, end);
        let ratio = if total_count == 0 {
            0.0
        } else {
            article_count as f64 / total_count as f64
        };

        let bucket = match period {
            AggregatePeriod::After => start,
            AggregatePeriod::Before => end,
        };
        points.insert(
            bucket,
            NormalizedPoint {
                article_count,
                total_count,
                ratio,
            },
        );
    }

    trace!(article = %key, offset, windows = points.len(), "Normalized series built");

    Ok(NormalizedSeries { offset, points })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn flu() -> ArticleKey {
        ArticleKey::new("en", "Influenza")
    }

    /// Article and total counts for every day in `[first, first + days)`.
    fn counts_for(first: NaiveDate, days: i64, per_day: u64, total_per_day: u64) -> WikiCounts {
        let dates: Vec<NaiveDate> = (0..days).filter_map(|i| shift_date(first, i)).collect();
        let mut articles = BTreeMap::new();
        articles.insert(flu(), dates.iter().map(|d| (*d, per_day)).collect());
        let mut totals = BTreeMap::new();
        totals.insert(
            "en".to_string(),
            dates.iter().map(|d| (*d, total_per_day)).collect(),
        );
        WikiCounts::new(articles, totals)
    }

    fn weekly_truth() -> GroundTruth {
        GroundTruth::from_entries(vec![
            (d(2020, 1, 1), 10.0),
            (d(2020, 1, 8), 20.0),
            (d(2020, 1, 15), 30.0),
        ])
        .unwrap()
    }

    fn two_week_truth() -> GroundTruth {
        GroundTruth::from_entries(vec![(d(2020, 1, 1), 10.0), (d(2020, 1, 8), 20.0)]).unwrap()
    }

    #[test]
    fn test_after_mode_attributes_window_to_start() {
        // counts stop on 01-07; 01-08 closes the window without being recorded
        let counts = counts_for(d(2020, 1, 1), 7, 1, 10);

        let series =
            normalized_series(&counts, &two_week_truth(), &flu(), 0, AggregatePeriod::After)
                .unwrap();

        assert_eq!(series.dates(), vec![d(2020, 1, 1)]);
        let point = series.get(d(2020, 1, 1)).unwrap();
        assert_eq!(point.article_count, 7);
        assert_eq!(point.total_count, 70);
        assert!((point.ratio - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_day_after_last_count_closes_before_mode_window() {
        let counts = counts_for(d(2020, 1, 1), 7, 1, 10);

        let series =
            normalized_series(&counts, &two_week_truth(), &flu(), 0, AggregatePeriod::Before)
                .unwrap();

        assert_eq!(series.dates(), vec![d(2020, 1, 8)]);
        assert!((series.get(d(2020, 1, 8)).unwrap().ratio - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_past_closing_day_is_not_a_window_end() {
        let counts = counts_for(d(2020, 1, 1), 6, 1, 10);

        let result =
            normalized_series(&counts, &two_week_truth(), &flu(), 0, AggregatePeriod::After);

        assert!(matches!(
            result,
            Err(AnalysisError::InsufficientDates { found: 1, .. })
        ));
    }

    #[test]
    fn test_before_mode_attributes_window_to_end() {
        let counts = counts_for(d(2020, 1, 1), 15, 2, 8);

        let series =
            normalized_series(&counts, &weekly_truth(), &flu(), 0, AggregatePeriod::Before)
                .unwrap();

        assert_eq!(series.dates(), vec![d(2020, 1, 8), d(2020, 1, 15)]);
        for (_, point) in series.iter() {
            assert_eq!(point.article_count, 14);
            assert!((point.ratio - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_total_traffic_yields_zero_ratio() {
        let counts = counts_for(d(2020, 1, 1), 15, 0, 0);

        let series =
            normalized_series(&counts, &weekly_truth(), &flu(), 0, AggregatePeriod::After)
                .unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.ratios().iter().all(|r| *r == 0.0));
    }

    #[test]
    fn test_offset_shifts_window_boundaries() {
        let counts = counts_for(d(2020, 1, 1), 30, 1, 4);

        let series =
            normalized_series(&counts, &weekly_truth(), &flu(), 3, AggregatePeriod::After)
                .unwrap();

        assert_eq!(series.offset(), 3);
        assert_eq!(series.dates(), vec![d(2020, 1, 4), d(2020, 1, 11)]);
        assert_eq!(series.reference_dates(), vec![d(2020, 1, 1), d(2020, 1, 8)]);
    }

    #[test]
    fn test_numerators_cover_raw_counts_over_span() {
        let first = d(2020, 1, 1);
        let dates: Vec<NaiveDate> = (0..15).filter_map(|i| shift_date(first, i)).collect();
        let article: CountSeries = dates
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, (i as u64 * 7) % 5))
            .collect();
        let totals: CountSeries = dates.iter().map(|d| (*d, 100)).collect();
        let mut articles = BTreeMap::new();
        articles.insert(flu(), article.clone());
        let mut project_totals = BTreeMap::new();
        project_totals.insert("en".to_string(), totals);
        let counts = WikiCounts::new(articles, project_totals);

        for period in [AggregatePeriod::After, AggregatePeriod::Before] {
            let series =
                normalized_series(&counts, &weekly_truth(), &flu(), 0, period).unwrap();
            let numerators: u64 = series.iter().map(|(_, p)| p.article_count).sum();
            assert_eq!(numerators, article.sum_range(d(2020, 1, 1), d(2020, 1, 15)));
            for (_, p) in series.iter() {
                assert_eq!(p.ratio, p.article_count as f64 / p.total_count as f64);
            }
        }
    }

    #[test]
    fn test_missing_days_inside_window_count_as_zero() {
        let article: CountSeries = vec![(d(2020, 1, 1), 5), (d(2020, 1, 8), 5)]
            .into_iter()
            .collect();
        let totals: CountSeries = (0..7)
            .filter_map(|i| shift_date(d(2020, 1, 1), i))
            .map(|d| (d, 10))
            .collect();
        let mut articles = BTreeMap::new();
        articles.insert(flu(), article);
        let mut project_totals = BTreeMap::new();
        project_totals.insert("en".to_string(), totals);
        let counts = WikiCounts::new(articles, project_totals);
        let truth =
            GroundTruth::from_entries(vec![(d(2020, 1, 1), 1.0), (d(2020, 1, 8), 2.0)]).unwrap();

        let series =
            normalized_series(&counts, &truth, &flu(), 0, AggregatePeriod::After).unwrap();

        let point = series.get(d(2020, 1, 1)).unwrap();
        assert_eq!(point.article_count, 5);
        assert_eq!(point.total_count, 70);
    }

    #[test]
    fn test_fewer_than_two_aligned_dates_is_an_error() {
        let counts = counts_for(d(2020, 1, 1), 5, 1, 10);

        let result = normalized_series(&counts, &weekly_truth(), &flu(), 0, AggregatePeriod::After);

        match result {
            Err(AnalysisError::InsufficientDates { found, offset, .. }) => {
                assert_eq!(found, 1);
                assert_eq!(offset, 0);
            }
            other => panic!("expected insufficient dates, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_article_is_an_error() {
        let counts = counts_for(d(2020, 1, 1), 15, 1, 10);
        let missing = ArticleKey::new("de", "Grippe");

        let result =
            normalized_series(&counts, &weekly_truth(), &missing, 0, AggregatePeriod::After);

        assert!(matches!(result, Err(AnalysisError::UnknownArticle(_))));
    }
}

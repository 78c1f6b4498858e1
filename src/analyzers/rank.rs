use crate::analyzers::aggregate::normalized_series;
use crate::analyzers::types::{AggregatePeriod, ArticleCorrelation, GroundTruth, WikiCounts};
use crate::analyzers::utility::pearson;
use crate::error::Result;
use tracing::{debug, info};

/// Number of articles kept by the correlation ranking unless configured otherwise.
pub const DEFAULT_TOP_ARTICLES: usize = 10;

/// Ranks every article by the absolute Pearson correlation of its offset-0
/// normalized series with the ground truth, keeping the best `top`.
///
/// Articles with an undefined (NaN) correlation are skipped. Equal absolute
/// correlations keep the lexicographic order of the article keys.
#[tracing::instrument(skip(counts, truth), fields(articles = counts.article_count()))]
pub fn rank_articles(
    counts: &WikiCounts,
    truth: &GroundTruth,
    period: AggregatePeriod,
    top: usize,
) -> Result<Vec<ArticleCorrelation>> {
    let mut correlations = Vec::new();

    for key in counts.article_keys() {
        let series = normalized_series(counts, truth, key, 0, period)?;

        let wiki = series.ratios();
        let reference: Vec<f64> = series
            .dates()
            .into_iter()
            .filter_map(|d| truth.get(d))
            .collect();

        let correlation = pearson(&wiki, &reference);
        if correlation.is_nan() {
            debug!(article = %key, "Correlation undefined, skipping article");
            continue;
        }

        correlations.push(ArticleCorrelation {
            article: key.clone(),
            correlation,
        });
    }

    // stable sort: ties stay in key order
    correlations.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    correlations.truncate(top);

    info!(ranked = correlations.len(), "Article ranking complete");
    Ok(correlations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{ArticleKey, CountSeries};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i)
    }

    /// Weekly ground truth, one date per value.
    fn truth(values: &[f64]) -> GroundTruth {
        GroundTruth::from_entries(values.iter().enumerate().map(|(i, v)| (day(i as i64 * 7), *v)))
            .unwrap()
    }

    /// Article whose per-window daily count is `weekly[w]`.
    fn weekly_series(weekly: &[u64]) -> CountSeries {
        let mut series = CountSeries::new();
        for (w, count) in weekly.iter().enumerate() {
            for i in 0..7 {
                series.add(day(w as i64 * 7 + i), *count);
            }
        }
        series.add(day(weekly.len() as i64 * 7), 0);
        series
    }

    fn counts(articles: Vec<(&str, Vec<u64>)>) -> WikiCounts {
        let weeks = articles.first().map(|(_, w)| w.len()).unwrap_or(0);
        let mut map = BTreeMap::new();
        for (name, weekly) in articles {
            map.insert(ArticleKey::new("en", name), weekly_series(&weekly));
        }
        let mut totals = BTreeMap::new();
        totals.insert("en".to_string(), weekly_series(&vec![1000; weeks]));
        WikiCounts::new(map, totals)
    }

    #[test]
    fn test_ranking_sorted_by_absolute_correlation() {
        let truth = truth(&[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
        let counts = counts(vec![
            ("Zeta", vec![10, 20, 30, 40, 50]),
            ("Noisy", vec![10, 30, 20, 50, 40]),
            ("Alpha", vec![10, 20, 30, 40, 50]),
        ]);

        let ranking = rank_articles(&counts, &truth, AggregatePeriod::After, 10).unwrap();

        assert_eq!(ranking.len(), 3);
        // identical series tie exactly, so key order decides
        assert_eq!(ranking[0].article.article, "Alpha");
        assert_eq!(ranking[1].article.article, "Zeta");
        assert_eq!(ranking[2].article.article, "Noisy");
        assert_eq!(ranking[0].correlation, ranking[1].correlation);
        assert!((ranking[2].correlation - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_uses_absolute_value_and_keeps_sign() {
        let truth = truth(&[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
        let counts = counts(vec![
            ("Falling", vec![50, 40, 30, 20, 10]),
            ("Noisy", vec![10, 30, 20, 50, 40]),
        ]);

        let ranking = rank_articles(&counts, &truth, AggregatePeriod::After, 10).unwrap();

        assert_eq!(ranking[0].article.article, "Falling");
        assert!((ranking[0].correlation + 1.0).abs() < 1e-9);
        for pair in ranking.windows(2) {
            assert!(pair[0].correlation.abs() >= pair[1].correlation.abs());
        }
    }

    #[test]
    fn test_ranking_excludes_nan_and_truncates() {
        let truth = truth(&[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
        let counts = counts(vec![
            ("A", vec![10, 20, 30, 40, 50]),
            ("B", vec![10, 20, 30, 50, 40]),
            ("Constant", vec![7, 7, 7, 7, 7]),
            ("D", vec![50, 10, 30, 20, 40]),
        ]);

        let ranking = rank_articles(&counts, &truth, AggregatePeriod::After, 2).unwrap();

        assert_eq!(ranking.len(), 2);
        assert!(ranking.iter().all(|c| !c.correlation.is_nan()));
        assert!(ranking.iter().all(|c| c.article.article != "Constant"));
        assert_eq!(ranking[0].article.article, "A");
    }
}

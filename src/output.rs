//! Reporting and persistence for rankings and lag fits.
//!
//! Supports structured logging of the ranking, a per-offset CSV, and a JSON
//! summary of the whole run.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::{AggregatePeriod, ArticleCorrelation, LagFit};
use csv::WriterBuilder;
use std::fs::File;
use std::path::Path;

/// One row of the lag CSV.
#[derive(Debug, Serialize)]
pub struct LagRecord {
    pub offset: i64,
    pub forecast_days: i64,
    pub observations: usize,
    pub r_squared: f64,
}

impl From<&LagFit> for LagRecord {
    fn from(fit: &LagFit) -> Self {
        Self {
            offset: fit.offset,
            forecast_days: fit.forecast_days(),
            observations: fit.observations(),
            r_squared: fit.r_squared,
        }
    }
}

/// Per-offset entry of the JSON summary.
#[derive(Debug, Serialize)]
pub struct LagSummary {
    pub offset: i64,
    pub forecast_days: i64,
    pub r_squared: f64,
    pub rank: usize,
    pub coefficients: Vec<f64>,
}

/// Everything a run computed, serialized as the JSON summary.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub aggregate_period: AggregatePeriod,
    pub ranking: &'a [ArticleCorrelation],
    pub lags: Vec<LagSummary>,
}

impl<'a> RunSummary<'a> {
    pub fn new(
        aggregate_period: AggregatePeriod,
        ranking: &'a [ArticleCorrelation],
        fits: &[LagFit],
    ) -> Self {
        let lags = fits
            .iter()
            .map(|fit| LagSummary {
                offset: fit.offset,
                forecast_days: fit.forecast_days(),
                r_squared: fit.r_squared,
                rank: fit.rank,
                coefficients: fit.coefficients.clone(),
            })
            .collect();
        Self {
            aggregate_period,
            ranking,
            lags,
        }
    }
}

/// Logs each ranked article with its correlation.
pub fn log_ranking(ranking: &[ArticleCorrelation]) {
    for (rank, entry) in ranking.iter().enumerate() {
        info!(
            rank = rank + 1,
            project = %entry.article.project,
            article = %entry.article.article,
            correlation = entry.correlation,
            "Ranked article"
        );
    }
}

/// Writes one [`LagRecord`] per fit to a fresh CSV file at `path`.
pub fn write_lag_csv(path: impl AsRef<Path>, fits: &[LagFit]) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), rows = fits.len(), "Writing lag CSV");

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for fit in fits {
        writer.serialize(LagRecord::from(fit))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the run summary as pretty-printed JSON.
pub fn write_summary_json(path: impl AsRef<Path>, summary: &RunSummary<'_>) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Writing JSON summary");
    std::fs::write(path, serde_json::to_string_pretty(summary)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::ArticleKey;
    use chrono::NaiveDate;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn fits() -> Vec<LagFit> {
        (-1..=1)
            .map(|offset| LagFit {
                offset,
                dates: vec![NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()],
                coefficients: vec![1.0, 2.0],
                fitted: vec![3.0],
                r_squared: 0.5,
                rank: 2,
            })
            .collect()
    }

    #[test]
    fn test_log_ranking_does_not_panic() {
        log_ranking(&[ArticleCorrelation {
            article: ArticleKey::new("en", "Influenza"),
            correlation: 0.9,
        }]);
    }

    #[test]
    fn test_write_lag_csv_one_row_per_offset() {
        let path = temp_path("wikilag_test_lags.csv");
        let _ = fs::remove_file(&path);

        write_lag_csv(&path, &fits()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "offset,forecast_days,observations,r_squared");
        assert_eq!(lines[1], "-1,1,1,0.5");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_lag_csv_overwrites() {
        let path = temp_path("wikilag_test_lags_overwrite.csv");

        write_lag_csv(&path, &fits()).unwrap();
        write_lag_csv(&path, &fits()[..1]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_summary_json() {
        let path = temp_path("wikilag_test_summary.json");
        let ranking = vec![ArticleCorrelation {
            article: ArticleKey::new("en", "Influenza"),
            correlation: -0.75,
        }];
        let fits = fits();
        let summary = RunSummary::new(AggregatePeriod::Before, &ranking, &fits);

        write_summary_json(&path, &summary).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["aggregate_period"], "before");
        assert_eq!(value["ranking"][0]["article"]["article"], "Influenza");
        assert_eq!(value["lags"].as_array().unwrap().len(), 3);
        assert_eq!(value["lags"][0]["forecast_days"], 1);
        assert_eq!(value["lags"][0]["rank"], 2);

        fs::remove_file(&path).unwrap();
    }
}

use crate::analyzers::aggregate::normalized_series;
use crate::analyzers::regression::{design_matrix, fit_ols};
use crate::analyzers::types::{
    AggregatePeriod, ArticleCorrelation, GroundTruth, LagFit, NormalizedSeries, WikiCounts,
    shift_date,
};
use crate::error::{AnalysisError, Result};
use ndarray::Array1;
use tracing::{debug, info};

/// Largest offset, in days, scanned in either direction by default.
pub const DEFAULT_MAX_LAG: i64 = 28;

/// Fits one regression per offset in `-max_lag..=max_lag`, regressing the
/// ground truth on the ranked articles' normalized series shifted by that
/// offset. Fits are returned in ascending offset order.
#[tracing::instrument(skip(counts, truth, ranking), fields(articles = ranking.len()))]
pub fn scan_lags(
    counts: &WikiCounts,
    truth: &GroundTruth,
    ranking: &[ArticleCorrelation],
    period: AggregatePeriod,
    max_lag: i64,
) -> Result<Vec<LagFit>> {
    if ranking.is_empty() {
        return Err(AnalysisError::NoRankedArticles);
    }

    let mut fits = Vec::new();
    for offset in -max_lag..=max_lag {
        let fit = fit_offset(counts, truth, ranking, period, offset)?;
        debug!(offset, r_squared = fit.r_squared, observations = fit.observations(), "Lag fitted");
        fits.push(fit);
    }

    if let Some(best) = fits.iter().max_by(|a, b| a.r_squared.total_cmp(&b.r_squared)) {
        info!(
            offsets = fits.len(),
            best_offset = best.offset,
            best_r_squared = best.r_squared,
            "Lag scan complete"
        );
    }
    Ok(fits)
}

/// Fits the regression for a single offset.
pub fn fit_offset(
    counts: &WikiCounts,
    truth: &GroundTruth,
    ranking: &[ArticleCorrelation],
    period: AggregatePeriod,
    offset: i64,
) -> Result<LagFit> {
    let Some(first) = ranking.first() else {
        return Err(AnalysisError::NoRankedArticles);
    };

    let series = ranking
        .iter()
        .map(|c| normalized_series(counts, truth, &c.article, offset, period))
        .collect::<Result<Vec<NormalizedSeries>>>()?;

    let dates = series[0].dates();
    for (correlation, other) in ranking.iter().zip(&series).skip(1) {
        if other.dates() != dates {
            return Err(AnalysisError::MisalignedSeries {
                article: correlation.article.clone(),
                first: first.article.clone(),
                offset,
            });
        }
    }

    // every shifted date maps back onto a ground-truth date by construction
    let y: Array1<f64> = dates
        .iter()
        .filter_map(|d| shift_date(*d, -offset))
        .filter_map(|d| truth.get(d))
        .collect();
    if y.len() != dates.len() {
        return Err(AnalysisError::Regression(format!(
            "ground truth covers {} of {} observations at offset {}",
            y.len(),
            dates.len(),
            offset
        )));
    }

    let columns: Vec<Vec<f64>> = series.iter().map(NormalizedSeries::ratios).collect();
    let x = design_matrix(dates.len(), &columns)?;
    let ols = fit_ols(&x, &y)?;
    if ols.rank < x.ncols() {
        debug!(offset, rank = ols.rank, columns = x.ncols(), "Design matrix is rank deficient");
    }

    Ok(LagFit {
        offset,
        dates,
        coefficients: ols.coefficients.to_vec(),
        fitted: ols.fitted.to_vec(),
        r_squared: ols.r_squared,
        rank: ols.rank,
    })
}

//! Ordinary least squares via Householder QR with column pivoting.
//!
//! Linearly dependent columns are detected during pivoting and given a zero
//! coefficient, so fitted values and R² match the pseudo-inverse solution
//! even when the design matrix is rank deficient.

use crate::error::{AnalysisError, Result};
use ndarray::{Array1, Array2};

/// Residual norm, relative to a unit-norm column, below which a column is
/// treated as linearly dependent on the columns already chosen.
const RANK_TOLERANCE: f64 = 1e-10;

/// Result of an OLS fit.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// One coefficient per design-matrix column, in column order.
    pub coefficients: Array1<f64>,
    pub fitted: Array1<f64>,
    pub r_squared: f64,
    /// Numerical rank of the design matrix.
    pub rank: usize,
}

/// Builds a design matrix with a leading intercept column of ones followed by
/// `columns` in order. Every column must have `rows` entries.
pub fn design_matrix(rows: usize, columns: &[Vec<f64>]) -> Result<Array2<f64>> {
    let mut x = Array2::<f64>::ones((rows, columns.len() + 1));
    for (j, column) in columns.iter().enumerate() {
        if column.len() != rows {
            return Err(AnalysisError::Regression(format!(
                "column {} has {} rows, expected {}",
                j,
                column.len(),
                rows
            )));
        }
        for (i, value) in column.iter().enumerate() {
            x[[i, j + 1]] = *value;
        }
    }
    Ok(x)
}

/// Fits `y ~ x` by least squares.
pub fn fit_ols(x: &Array2<f64>, y: &Array1<f64>) -> Result<OlsFit> {
    let (n, p) = x.dim();
    if n == 0 || p == 0 {
        return Err(AnalysisError::Regression(format!(
            "empty design matrix ({n} x {p})"
        )));
    }
    if y.len() != n {
        return Err(AnalysisError::Regression(format!(
            "response has {} rows, design matrix has {}",
            y.len(),
            n
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AnalysisError::Regression(
            "non-finite value in regression input".to_string(),
        ));
    }

    // equilibrate so the rank tolerance does not depend on column scale
    let scales: Vec<f64> = (0..p)
        .map(|j| match column_norm(x, j, 0) {
            norm if norm > 0.0 => norm,
            _ => 1.0,
        })
        .collect();
    let mut a = x.clone();
    for (j, scale) in scales.iter().enumerate() {
        a.column_mut(j).mapv_inplace(|v| v / scale);
    }
    let mut b = y.clone();
    let mut perm: Vec<usize> = (0..p).collect();

    let mut rank = 0;
    for k in 0..n.min(p) {
        let (pivot, pivot_norm) = (k..p)
            .map(|j| (j, column_norm(&a, j, k)))
            .fold((k, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if pivot_norm <= RANK_TOLERANCE {
            break;
        }
        if pivot != k {
            for i in 0..n {
                a.swap([i, k], [i, pivot]);
            }
            perm.swap(k, pivot);
        }

        // reflect a[k.., k] onto -sign(a[k,k]) * |a[k.., k]| * e_k
        let alpha = if a[[k, k]] > 0.0 { -pivot_norm } else { pivot_norm };
        let mut v: Vec<f64> = (k..n).map(|i| a[[i, k]]).collect();
        v[0] -= alpha;
        let v_norm2: f64 = v.iter().map(|e| e * e).sum();
        if v_norm2 > 0.0 {
            for j in k..p {
                let dot: f64 = (k..n).map(|i| v[i - k] * a[[i, j]]).sum();
                let scale = 2.0 * dot / v_norm2;
                for i in k..n {
                    a[[i, j]] -= scale * v[i - k];
                }
            }
            let dot: f64 = (k..n).map(|i| v[i - k] * b[i]).sum();
            let scale = 2.0 * dot / v_norm2;
            for i in k..n {
                b[i] -= scale * v[i - k];
            }
        }
        rank += 1;
    }

    // back substitution on the leading rank x rank block of R
    let mut z = vec![0.0; rank];
    for i in (0..rank).rev() {
        let tail: f64 = (i + 1..rank).map(|j| a[[i, j]] * z[j]).sum();
        z[i] = (b[i] - tail) / a[[i, i]];
    }

    let mut coefficients = Array1::<f64>::zeros(p);
    for (i, value) in z.into_iter().enumerate() {
        coefficients[perm[i]] = value / scales[perm[i]];
    }

    let fitted = x.dot(&coefficients);
    let r_squared = r_squared(y, &fitted);

    Ok(OlsFit {
        coefficients,
        fitted,
        r_squared,
        rank,
    })
}

/// Coefficient of determination against the mean of `actual`, clamped to `[0, 1]`.
///
/// A constant response is reported as 1.0 when the fit reproduces it and 0.0
/// otherwise.
pub fn r_squared(actual: &Array1<f64>, fitted: &Array1<f64>) -> f64 {
    let n = actual.len();
    if n == 0 || fitted.len() != n {
        return 0.0;
    }
    let mean = actual.sum() / n as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(fitted.iter())
        .map(|(a, f)| (a - f).powi(2))
        .sum();
    let scale: f64 = actual.iter().map(|a| a * a).sum::<f64>().max(f64::MIN_POSITIVE);

    if ss_tot <= 1e-12 * scale {
        return if ss_res <= 1e-12 * scale { 1.0 } else { 0.0 };
    }

    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

fn column_norm(a: &Array2<f64>, j: usize, from_row: usize) -> f64 {
    (from_row..a.nrows())
        .map(|i| a[[i, j]] * a[[i, j]])
        .sum::<f64>()
        .sqrt()
}

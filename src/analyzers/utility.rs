/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pearson correlation coefficient of two equally long samples.
///
/// Returns NaN when the lengths differ, when there are fewer than two
/// observations, or when either sample has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }

    (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

/// Scales values so the largest of `values` and `companion` becomes 1.
///
/// Values are returned unchanged when that maximum is not positive.
pub fn scale_to_max(values: &[f64], companion: &[f64]) -> Vec<f64> {
    let max = values
        .iter()
        .chain(companion)
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        values.iter().map(|v| v / max).collect()
    } else {
        values.to_vec()
    }
}

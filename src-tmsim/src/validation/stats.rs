//! Error and correlation statistics

use ndarray::ArrayView1;

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    ArrayView1::from(values).mean().unwrap_or(0.0)
}

/// Sample standard deviation (n − 1), 0 below two samples
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    ArrayView1::from(values).std(1.0)
}

/// Population standard deviation (n), 0 for an empty slice
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    ArrayView1::from(values).std(0.0)
}

/// Mean absolute error between two equally long series
///
/// Extra trailing values in the longer series are ignored.
pub fn mean_absolute_error(simulated: &[f64], measured: &[f64]) -> f64 {
    let n = simulated.len().min(measured.len());
    if n == 0 {
        return 0.0;
    }
    let sim = ArrayView1::from(&simulated[..n]);
    let real = ArrayView1::from(&measured[..n]);
    (&sim - &real).mapv(f64::abs).sum() / n as f64
}

/// Pearson correlation coefficient
///
/// `(nΣxy − ΣxΣy) / sqrt((nΣx² − (Σx)²)(nΣy² − (Σy)²))`, or 0 when the
/// denominator is not positive (constant series, fewer than two samples).
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let xs = ArrayView1::from(&x[..n]);
    let ys = ArrayView1::from(&y[..n]);
    let nf = n as f64;

    let sum_x = xs.sum();
    let sum_y = ys.sum();
    let sum_xy = xs.dot(&ys);
    let sum_x2 = xs.dot(&xs);
    let sum_y2 = ys.dot(&ys);

    let numerator = nf * sum_xy - sum_x * sum_y;
    let denominator = (nf * sum_x2 - sum_x * sum_x) * (nf * sum_y2 - sum_y * sum_y);
    if denominator <= 0.0 || denominator.is_nan() {
        return 0.0;
    }
    numerator / denominator.sqrt()
}

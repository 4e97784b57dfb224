use itertools::{Itertools, MinMaxResult};

pub fn arithmetic_mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

pub fn weighted_mean(x: &[f64], weights: &[f64]) -> f64 {
    let sum = x
        .iter()
        .zip(weights.iter())
        .map(|(x, w)| x * w)
        .sum::<f64>();
    let sum_of_weights = weights.iter().sum::<f64>();
    sum / sum_of_weights
}

/// Standard deviation with `n` in the denominator
pub fn population_std(x: &[f64]) -> f64 {
    let mean = arithmetic_mean(x);
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / x.len() as f64;
    var.sqrt()
}

/// Squared Pearson correlation coefficient
///
/// NaN when either vector has no variance. Both vectors must have the same length.
pub fn pearson_r2(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    let mx = arithmetic_mean(x);
    let my = arithmetic_mean(y);
    let (sxy, sxx, syy) = x
        .iter()
        .zip(y.iter())
        .fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (a, b)| {
            let (dx, dy) = (a - mx, b - my);
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        });
    let r = sxy / (sxx * syy).sqrt();
    r * r
}

/// Range of the non-missing values, NaN if there are none
pub fn amplitude(x: &[f64]) -> f64 {
    match x.iter().filter(|v| !v.is_nan()).minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => f64::NAN,
        MinMaxResult::OneElement(_) => 0.0,
        MinMaxResult::MinMax(min, max) => max - min,
    }
}

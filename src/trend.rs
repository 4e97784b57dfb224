use derive_new::new;

use crate::{
    error::RonaError,
    math::arithmetic_mean,
    utils::{paired_valid_indices, select_indices},
};

/// A fitted degree-1 polynomial `slope * x + intercept`
#[derive(new, Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluates the trend at `x`, including values outside the fitted range
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares fit of `y` on `x`
///
/// Positions where either value is NaN are dropped before fitting.
pub fn fit_linear(x: &[f64], y: &[f64]) -> Result<LinearFit, RonaError> {
    if x.len() != y.len() {
        return Err(RonaError::alignment("fit y values", y.len(), x.len()));
    }
    let valid = paired_valid_indices(x, y);
    if valid.len() < 2 {
        return Err(RonaError::InsufficientData(format!(
            "linear fit needs at least 2 valid points, found {}",
            valid.len()
        )));
    }
    let x = select_indices(&valid, x);
    let y = select_indices(&valid, y);

    let mx = arithmetic_mean(&x);
    let my = arithmetic_mean(&y);
    let (sxy, sxx) = x
        .iter()
        .zip(y.iter())
        .fold((0.0, 0.0), |(sxy, sxx), (a, b)| {
            (sxy + (a - mx) * (b - my), sxx + (a - mx).powi(2))
        });
    if sxx == 0.0 {
        return Err(RonaError::InsufficientData(
            "linear fit needs at least 2 distinct covariate values".to_string(),
        ));
    }

    let slope = sxy / sxx;
    Ok(LinearFit::new(slope, my - slope * mx))
}

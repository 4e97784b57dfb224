//! Outlier detection on (covariate, frequency) pairs using the Mahalanobis distance.

use crate::{config::OutlierConfig, error::RonaError, math::arithmetic_mean};

/// Multiplier applied to the mean distance to obtain the rejection threshold
const THRESHOLD_FACTOR: f64 = 1.5;

/// Smallest tolerated |det| of the covariance matrix relative to var(x) * var(y)
const SINGULARITY_TOLERANCE: f64 = 1e-12;

/// Mahalanobis distance of every (x, y) point from the bivariate mean
///
/// The covariance matrix is the unbiased sample estimate (n - 1 denominator).
/// Requires at least three points and a non-singular covariance matrix.
pub fn mahalanobis_distances(x: &[f64], y: &[f64]) -> Result<Vec<f64>, RonaError> {
    if x.len() != y.len() {
        return Err(RonaError::alignment("outlier y coordinates", y.len(), x.len()));
    }
    let n = x.len();
    if n < 3 {
        return Err(RonaError::InsufficientData(format!(
            "Mahalanobis distance needs at least 3 points, found {n}"
        )));
    }

    let mx = arithmetic_mean(x);
    let my = arithmetic_mean(y);
    let denom = (n - 1) as f64;
    let (sxx, syy, sxy) = x
        .iter()
        .zip(y.iter())
        .fold((0.0, 0.0, 0.0), |(sxx, syy, sxy), (a, b)| {
            let (dx, dy) = (a - mx, b - my);
            (sxx + dx * dx, syy + dy * dy, sxy + dx * dy)
        });
    let (sxx, syy, sxy) = (sxx / denom, syy / denom, sxy / denom);

    let det = sxx * syy - sxy * sxy;
    if !det.is_finite() || det <= SINGULARITY_TOLERANCE * sxx * syy {
        return Err(RonaError::InsufficientData(
            "covariance matrix is singular (constant or collinear points)".to_string(),
        ));
    }

    // Inverse of [[sxx, sxy], [sxy, syy]]
    let (ixx, iyy, ixy) = (syy / det, sxx / det, -sxy / det);

    Ok(x.iter()
        .zip(y.iter())
        .map(|(a, b)| {
            let (dx, dy) = (a - mx, b - my);
            (dx * dx * ixx + 2.0 * dx * dy * ixy + dy * dy * iyy).sqrt()
        })
        .collect())
}

/// Indices (ascending) of the points whose distance exceeds 1.5 times the mean distance
pub fn detect_outliers(x: &[f64], y: &[f64]) -> Result<Vec<usize>, RonaError> {
    let distances = mahalanobis_distances(x, y)?;
    let threshold = arithmetic_mean(&distances) * THRESHOLD_FACTOR;
    Ok(distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > threshold)
        .map(|(i, _)| i)
        .collect())
}

/// The single most distant point, if it reaches 1.5 times the mean distance
pub fn detect_worst_outlier(x: &[f64], y: &[f64]) -> Result<Option<usize>, RonaError> {
    let distances = mahalanobis_distances(x, y)?;
    let threshold = arithmetic_mean(&distances) * THRESHOLD_FACTOR;
    let worst = distances
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b));
    Ok(worst.filter(|(_, d)| **d >= threshold).map(|(i, _)| i))
}

impl OutlierConfig {
    /// Indices to mask for this configuration
    pub fn outliers(&self, x: &[f64], y: &[f64]) -> Result<Vec<usize>, RonaError> {
        match self {
            OutlierConfig::Keep => Ok(Vec::new()),
            OutlierConfig::RemoveWorst => Ok(detect_worst_outlier(x, y)?.into_iter().collect()),
            OutlierConfig::RemoveAll => detect_outliers(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{seq::SliceRandom, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn coords() -> (Vec<f64>, Vec<f64>) {
        let x = vec![
            114., 71., 59., 117., 107., 86., 93., 87., 80., 76., 71., 122., 118., 88., 98., 83.,
        ];
        let y = vec![
            0.1957648,
            -0.49158111,
            0.3691684,
            0.27138479,
            -0.00115721,
            0.29038402,
            -0.31815359,
            0.23805522,
            0.15150419,
            -0.31698508,
            0.4346372,
            0.13334157,
            -0.20163875,
            0.8946341,
            -0.38784942,
            -0.55615943,
        ];
        (x, y)
    }

    #[test]
    fn test_mahalanobis_known_values() {
        let (x, y) = coords();
        let expected = [
            1.226738, 1.758397, 1.895296, 1.445191, 0.798041, 0.691544, 0.919720, 0.550318,
            0.674364, 1.247352, 1.462154, 1.597006, 1.493014, 2.163516, 1.136237, 1.599590,
        ];
        let distances = mahalanobis_distances(&x, &y).unwrap();
        assert_eq!(distances.len(), expected.len());
        for (d, e) in distances.iter().zip(expected.iter()) {
            assert_relative_eq!(*d, *e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_detect_outliers_known_values() {
        let (x, y) = coords();
        assert_eq!(detect_outliers(&x, &y).unwrap(), vec![13]);
        assert_eq!(detect_worst_outlier(&x, &y).unwrap(), Some(13));
    }

    #[test]
    fn test_detect_outliers_permutation_invariant() {
        let (x, y) = coords();
        let mut order = (0..x.len()).collect::<Vec<_>>();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10 {
            order.shuffle(&mut rng);
            let px = order.iter().map(|i| x[*i]).collect::<Vec<_>>();
            let py = order.iter().map(|i| y[*i]).collect::<Vec<_>>();
            let outliers = detect_outliers(&px, &py).unwrap();
            assert!(outliers.iter().all(|i| *i < x.len()));
            let original = outliers.iter().map(|i| order[*i]).collect::<Vec<_>>();
            assert_eq!(original, vec![13]);
        }
    }

    #[test]
    fn test_too_few_points() {
        let err = detect_outliers(&[1.0, 2.0], &[0.1, 0.3]).unwrap_err();
        assert!(matches!(err, RonaError::InsufficientData(_)));
    }

    #[test]
    fn test_collinear_points_are_singular() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [0.2, 0.4, 0.6, 0.8];
        let err = mahalanobis_distances(&x, &y).unwrap_err();
        assert!(matches!(err, RonaError::InsufficientData(_)));
    }

    #[test]
    fn test_constant_points_are_singular() {
        let err = detect_outliers(&[5.0, 5.0, 5.0], &[0.1, 0.2, 0.4]).unwrap_err();
        assert!(matches!(err, RonaError::InsufficientData(_)));
    }

    #[test]
    fn test_keep_config_never_flags() {
        let (x, y) = coords();
        assert!(OutlierConfig::Keep.outliers(&x, &y).unwrap().is_empty());
        assert_eq!(OutlierConfig::RemoveAll.outliers(&x, &y).unwrap(), vec![13]);
    }
}

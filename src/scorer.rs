use derive_new::new;

use crate::{
    config::ScoreRule,
    error::RonaError,
    math::{amplitude, pearson_r2},
    trend::LinearFit,
    utils::{paired_valid_indices, select_indices},
};

/// RONA of every population for one marker, along with the R² of its trend
#[derive(new, Debug, Clone, PartialEq)]
pub struct MarkerScore {
    pub scores: Vec<f64>,
    pub fit_quality: f64,
}

/// Scores one marker against its fitted trend
///
/// `present`, `future` and `freqs` must be aligned to the same population order,
/// otherwise an alignment error is returned.
/// Populations with a missing present value, future value or frequency score NaN.
/// When the frequencies have no amplitude the amplitude-relative rules score NaN
/// for every population.
pub fn score_marker(
    present: &[f64],
    future: &[f64],
    freqs: &[f64],
    fit: &LinearFit,
    rule: ScoreRule,
) -> Result<MarkerScore, RonaError> {
    if future.len() != present.len() {
        return Err(RonaError::alignment("future covariate", future.len(), present.len()));
    }
    if freqs.len() != present.len() {
        return Err(RonaError::alignment("allele frequencies", freqs.len(), present.len()));
    }

    let valid = paired_valid_indices(present, freqs);
    let fit_quality = pearson_r2(
        &select_indices(&valid, present),
        &select_indices(&valid, freqs),
    );

    let amplitude = amplitude(freqs);
    let degenerate = rule.uses_amplitude() && (amplitude.is_nan() || amplitude == 0.0);

    let scores = present
        .iter()
        .zip(future.iter())
        .zip(freqs.iter())
        .map(|((pres, fut), freq)| {
            if degenerate || pres.is_nan() || fut.is_nan() || freq.is_nan() {
                return f64::NAN;
            }
            let pres_dist = freq - fit.eval(*pres);
            let fut_dist = freq - fit.eval(*fut);
            rule.score(pres_dist, fut_dist, amplitude)
        })
        .collect();

    Ok(MarkerScore::new(scores, fit_quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::fit_linear;
    use approx::assert_relative_eq;

    #[test]
    fn test_score_rules_by_hand() {
        // trend: freq = 0.1 * covar
        let present = [1.0, 2.0, 3.0];
        let future = [2.0, 2.0, 5.0];
        let freqs = [0.1, 0.3, 0.3];
        let fit = LinearFit::new(0.1, 0.0);

        // pres_dist = [0.0, 0.1, 0.0], fut_dist = [-0.1, 0.1, -0.2], amplitude = 0.2
        let diff = score_marker(&present, &future, &freqs, &fit, ScoreRule::Diff).unwrap();
        let expected = [0.5, 0.0, 1.0];
        for (s, e) in diff.scores.iter().zip(expected.iter()) {
            assert_relative_eq!(*s, *e, epsilon = 1e-12);
        }

        let dist = score_marker(&present, &future, &freqs, &fit, ScoreRule::Dist).unwrap();
        let expected = [0.1, 0.1, 0.2];
        for (s, e) in dist.scores.iter().zip(expected.iter()) {
            assert_relative_eq!(*s, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_absdiff_is_unsigned() {
        let present = [1.0, 2.0, 3.0];
        let future = [0.0, 4.0, 3.0];
        let freqs = [0.1, 0.2, 0.3];
        let fit = fit_linear(&present, &freqs).unwrap();
        let diff = score_marker(&present, &future, &freqs, &fit, ScoreRule::Diff).unwrap();
        let absdiff = score_marker(&present, &future, &freqs, &fit, ScoreRule::AbsDiff).unwrap();
        assert!(diff.scores[0] < 0.0);
        assert!(diff.scores[1] > 0.0);
        for (d, a) in diff.scores.iter().zip(absdiff.scores.iter()) {
            assert_relative_eq!(d.abs(), *a, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_amplitude_is_nan() {
        let present = [1.0, 2.0, 3.0];
        let future = [2.0, 3.0, 4.0];
        let freqs = [0.4, 0.4, 0.4];
        let fit = fit_linear(&present, &freqs).unwrap();
        for rule in [ScoreRule::Diff, ScoreRule::AbsDiff] {
            let result = score_marker(&present, &future, &freqs, &fit, rule).unwrap();
            assert_eq!(result.scores.len(), 3);
            assert!(result.scores.iter().all(|s| s.is_nan()));
        }
        let dist = score_marker(&present, &future, &freqs, &fit, ScoreRule::Dist).unwrap();
        assert!(dist.scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_unchanged_environment_on_trend_scores_zero() {
        let present = [1.0, 2.0, 3.0, 4.0];
        let freqs = [0.2, 0.4, 0.6, 0.8];
        let fit = fit_linear(&present, &freqs).unwrap();
        for rule in [ScoreRule::Diff, ScoreRule::AbsDiff] {
            let result = score_marker(&present, &present, &freqs, &fit, rule).unwrap();
            for s in &result.scores {
                assert_relative_eq!(*s, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_missing_values_only_affect_their_population() {
        let present = [1.0, 2.0, f64::NAN, 4.0, 5.0];
        let future = [1.5, f64::NAN, 3.5, 4.5, 5.5];
        let freqs = [0.1, 0.25, 0.3, f64::NAN, 0.5];
        let fit = fit_linear(&present, &freqs).unwrap();
        let result = score_marker(&present, &future, &freqs, &fit, ScoreRule::AbsDiff).unwrap();
        assert_eq!(result.scores.len(), 5);
        assert!(result.scores[0].is_finite());
        assert!(result.scores[1].is_nan());
        assert!(result.scores[2].is_nan());
        assert!(result.scores[3].is_nan());
        assert!(result.scores[4].is_finite());
        assert!(result.fit_quality.is_finite());
    }

    #[test]
    fn test_fit_quality_uses_valid_pairs() {
        let present = [1.0, 2.0, 3.0, f64::NAN];
        let freqs = [0.1, 0.2, 0.3, 0.9];
        let fit = fit_linear(&present, &freqs).unwrap();
        let result = score_marker(&present, &present, &freqs, &fit, ScoreRule::AbsDiff).unwrap();
        assert_relative_eq!(result.fit_quality, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let present = [12.1, 14.3, 9.8, 11.0, 15.2];
        let future = [13.4, 15.9, 11.1, 12.0, 17.3];
        let freqs = [0.12, -0.4, 0.33, 0.05, -0.61];
        let fit = fit_linear(&present, &freqs).unwrap();
        let a = score_marker(&present, &future, &freqs, &fit, ScoreRule::AbsDiff).unwrap();
        let b = score_marker(&present, &future, &freqs, &fit, ScoreRule::AbsDiff).unwrap();
        assert_eq!(
            a.scores.iter().map(|s| s.to_bits()).collect::<Vec<_>>(),
            b.scores.iter().map(|s| s.to_bits()).collect::<Vec<_>>()
        );
        assert_eq!(a.fit_quality.to_bits(), b.fit_quality.to_bits());
    }

    #[test]
    fn test_misaligned_vectors() {
        let fit = LinearFit::new(0.1, 0.0);
        let err = score_marker(
            &[1.0, 2.0, 3.0, 4.0],
            &[1.0, 2.0],
            &[0.1, 0.3, 0.2, 0.5],
            &fit,
            ScoreRule::AbsDiff,
        )
        .unwrap_err();
        assert_eq!(err, RonaError::alignment("future covariate", 2, 4));

        let err =
            score_marker(&[1.0, 2.0], &[1.0, 2.0], &[0.1], &fit, ScoreRule::Dist).unwrap_err();
        assert_eq!(err, RonaError::alignment("allele frequencies", 1, 2));
    }
}

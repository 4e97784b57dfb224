use std::str::FromStr;

use bon::Builder;

/// Formula used to turn trend distances into a per-population RONA
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoreRule {
    /// Signed difference between present and future distance, relative to the amplitude
    Diff,
    /// Absolute difference between present and future distance, relative to the amplitude
    #[default]
    AbsDiff,
    /// Absolute distance between the frequency and the trend at the future value
    Dist,
}

impl ScoreRule {
    /// Scores a single population
    ///
    /// `pres_dist` and `fut_dist` are the frequency minus the trend evaluated at the
    /// present and future covariate values respectively.
    pub fn score(&self, pres_dist: f64, fut_dist: f64, amplitude: f64) -> f64 {
        match self {
            ScoreRule::Diff => (pres_dist - fut_dist) / amplitude,
            ScoreRule::AbsDiff => (pres_dist - fut_dist).abs() / amplitude,
            ScoreRule::Dist => fut_dist.abs(),
        }
    }

    pub fn uses_amplitude(&self) -> bool {
        !matches!(self, ScoreRule::Dist)
    }
}

impl FromStr for ScoreRule {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "diff" => Ok(ScoreRule::Diff),
            "absdiff" => Ok(ScoreRule::AbsDiff),
            "dist" => Ok(ScoreRule::Dist),
            _ => Err(format!(
                "Unknown RONA type '{s}'. Use 'diff', 'absdiff', or 'dist'."
            )),
        }
    }
}

/// Which points flagged by the Mahalanobis distance are masked before fitting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutlierConfig {
    Keep,
    /// Only the single most distant point, if it reaches the threshold
    RemoveWorst,
    /// Every point beyond the threshold
    #[default]
    RemoveAll,
}

impl OutlierConfig {
    pub fn remove_outliers(&self) -> bool {
        !matches!(self, OutlierConfig::Keep)
    }

    /// Maps the numeric levels exposed on the command line (0, 1, 2)
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(OutlierConfig::Keep),
            1 => Some(OutlierConfig::RemoveWorst),
            2 => Some(OutlierConfig::RemoveAll),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Builder)]
pub struct RonaConfig {
    #[builder(default)]
    pub score_rule: ScoreRule,
    /// Weight each marker by its R² when averaging across markers
    #[builder(default = true)]
    pub use_weights: bool,
    #[builder(default)]
    pub outliers: OutlierConfig,
    /// Number of covariates (most markers first) kept for reporting
    #[builder(default = 3)]
    pub num_covars: usize,
}

impl Default for RonaConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

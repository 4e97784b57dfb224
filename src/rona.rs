use rayon::prelude::*;

use crate::{
    accumulator::CovariateAccumulator,
    config::RonaConfig,
    error::RonaError,
    population::{Association, CovariateTable, FrequencyTable, PopulationOrder},
    results::{CovariateResult, RonaResults},
    scorer::{score_marker, MarkerScore},
    trend::fit_linear,
    utils::{group_by_covariate, mask_indices, paired_valid_indices},
};

/// Risk of Non-Adaptedness estimation over a set of marker-covariate associations
///
/// All vectors are aligned to `populations`.
pub struct Rona<'a> {
    populations: &'a PopulationOrder,
    present: &'a CovariateTable,
    future: &'a CovariateTable,
    frequencies: &'a FrequencyTable,
    config: RonaConfig,
}

impl<'a> Rona<'a> {
    pub fn new(
        populations: &'a PopulationOrder,
        present: &'a CovariateTable,
        future: &'a CovariateTable,
        frequencies: &'a FrequencyTable,
        config: RonaConfig,
    ) -> Self {
        Self {
            populations,
            present,
            future,
            frequencies,
            config,
        }
    }

    /// Run the RONA estimation
    ///
    /// 1. Check every referenced vector against the population order
    /// 2. Score each marker against the trend of its covariate
    /// 3. Reduce each covariate into per-population means
    /// 4. Rank the covariates by number of markers and keep the top ones
    ///
    /// Markers with too little data for outlier detection or trend fitting are
    /// skipped with a warning. Structural errors abort the run.
    pub fn run(&self, associations: &[Association]) -> Result<RonaResults, RonaError> {
        self.validate(associations)?;

        let groups = group_by_covariate(associations);
        log::info!(
            "Estimating RONA for {} associations across {} covariates",
            associations.len(),
            groups.len()
        );

        let mut results = Vec::with_capacity(groups.len());
        for (covariate, markers) in groups {
            let accumulator = self.accumulate(covariate, &markers)?;
            if accumulator.count_markers() == 0 {
                log::warn!("No markers could be scored for covariate {covariate}");
                continue;
            }
            results.push(CovariateResult::from_accumulator(
                &accumulator,
                self.populations.names(),
                self.config.use_weights,
            ));
        }

        Ok(RonaResults::from_vec(results, self.config.num_covars))
    }

    fn validate(&self, associations: &[Association]) -> Result<(), RonaError> {
        for assoc in associations {
            let present = self.present_values(&assoc.covariate)?;
            let future = self.future_values(&assoc.covariate)?;
            let freqs = self.marker_frequencies(&assoc.marker)?;
            self.populations
                .check_aligned(&format!("present covariate {}", assoc.covariate), present)?;
            self.populations
                .check_aligned(&format!("future covariate {}", assoc.covariate), future)?;
            self.populations
                .check_aligned(&format!("frequencies of marker {}", assoc.marker), freqs)?;
        }
        Ok(())
    }

    /// Scores every marker of one covariate and collects them in association order
    fn accumulate(
        &self,
        covariate: &str,
        markers: &[&str],
    ) -> Result<CovariateAccumulator, RonaError> {
        let scores = markers
            .par_iter()
            .map(|marker| self.process_marker(marker, covariate))
            .collect::<Vec<_>>();

        let mut accumulator = CovariateAccumulator::new(covariate, self.populations.len());
        for (marker, score) in markers.iter().zip(scores) {
            match score {
                Ok(score) => accumulator.add(marker, score)?,
                Err(RonaError::InsufficientData(reason)) => {
                    log::warn!("Skipping marker {marker} for covariate {covariate}: {reason}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(accumulator)
    }

    /// Process a single marker-covariate association
    ///
    /// Outliers are masked with NaN so every vector keeps its population alignment.
    fn process_marker(&self, marker: &str, covariate: &str) -> Result<MarkerScore, RonaError> {
        let mut present = self.present_values(covariate)?.to_vec();
        let mut future = self.future_values(covariate)?.to_vec();
        let mut freqs = self.marker_frequencies(marker)?.to_vec();

        if self.config.outliers.remove_outliers() {
            let outliers = self.find_outliers(&present, &freqs)?;
            if !outliers.is_empty() {
                log::debug!(
                    "Masking {} outlier populations of marker {marker} for covariate {covariate}",
                    outliers.len()
                );
            }
            mask_indices(&outliers, &mut present);
            mask_indices(&outliers, &mut future);
            mask_indices(&outliers, &mut freqs);
        }

        let fit = fit_linear(&present, &freqs)?;
        score_marker(&present, &future, &freqs, &fit, self.config.score_rule)
    }

    /// Outlier positions among the populations with both values present
    fn find_outliers(&self, present: &[f64], freqs: &[f64]) -> Result<Vec<usize>, RonaError> {
        let valid = paired_valid_indices(present, freqs);
        let (x, y): (Vec<f64>, Vec<f64>) = valid.iter().map(|i| (present[*i], freqs[*i])).unzip();
        Ok(self
            .config
            .outliers
            .outliers(&x, &y)?
            .into_iter()
            .map(|i| valid[i])
            .collect())
    }

    fn present_values(&self, covariate: &str) -> Result<&'a [f64], RonaError> {
        self.present
            .get(covariate)
            .ok_or_else(|| RonaError::UnknownCovariate(covariate.to_string()))
    }

    fn future_values(&self, covariate: &str) -> Result<&'a [f64], RonaError> {
        self.future
            .get(covariate)
            .ok_or_else(|| RonaError::UnknownCovariate(covariate.to_string()))
    }

    fn marker_frequencies(&self, marker: &str) -> Result<&'a [f64], RonaError> {
        self.frequencies
            .get(marker)
            .map(|v| v.as_slice())
            .ok_or_else(|| RonaError::MissingFrequencies(marker.to_string()))
    }
}

use std::collections::{btree_map::Entry, BTreeMap};

use crate::{
    error::RonaError,
    math::{arithmetic_mean, population_std, weighted_mean},
    scorer::MarkerScore,
};

/// Collects the marker scores of a single covariate
///
/// Markers are kept sorted by identifier so the reduction does not depend on
/// the order in which they were added.
#[derive(Debug, Clone)]
pub struct CovariateAccumulator {
    covariate: String,
    num_populations: usize,
    markers: BTreeMap<String, MarkerScore>,
}

/// Per-population mean RONA and its standard error
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub avg: Vec<f64>,
    pub stderr: Vec<f64>,
}

impl CovariateAccumulator {
    pub fn new(covariate: impl Into<String>, num_populations: usize) -> Self {
        Self {
            covariate: covariate.into(),
            num_populations,
            markers: BTreeMap::new(),
        }
    }

    pub fn covariate(&self) -> &str {
        &self.covariate
    }

    pub fn count_markers(&self) -> usize {
        self.markers.len()
    }

    /// R² of every marker, keyed by marker
    pub fn fit_qualities(&self) -> BTreeMap<String, f64> {
        self.markers
            .iter()
            .map(|(marker, score)| (marker.clone(), score.fit_quality))
            .collect()
    }

    pub fn add(&mut self, marker: &str, score: MarkerScore) -> Result<(), RonaError> {
        if score.scores.len() != self.num_populations {
            return Err(RonaError::alignment(
                format!("RONA scores of marker '{marker}'"),
                score.scores.len(),
                self.num_populations,
            ));
        }
        match self.markers.entry(marker.to_string()) {
            Entry::Occupied(_) => Err(RonaError::DuplicateMarker {
                marker: marker.to_string(),
                covariate: self.covariate.clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(score);
                Ok(())
            }
        }
    }

    /// Reduces the collected scores into a mean and standard error per population
    ///
    /// With `use_weights` each marker contributes proportionally to its R².
    /// Missing scores are left out of their population only; a population with no
    /// valid score at all reduces to NaN.
    pub fn reduce(&self, use_weights: bool) -> Reduction {
        if self.markers.len() == 1 {
            if let Some(score) = self.markers.values().next() {
                return Reduction {
                    avg: score.scores.clone(),
                    stderr: vec![0.0; self.num_populations],
                };
            }
        }

        let (avg, stderr) = (0..self.num_populations)
            .map(|pop| self.reduce_population(pop, use_weights))
            .unzip();
        Reduction { avg, stderr }
    }

    fn reduce_population(&self, pop: usize, use_weights: bool) -> (f64, f64) {
        let (values, weights): (Vec<f64>, Vec<f64>) = self
            .markers
            .values()
            .map(|score| (score.scores[pop], score.fit_quality))
            .filter(|(value, weight)| !value.is_nan() && !(use_weights && weight.is_nan()))
            .unzip();

        if values.is_empty() {
            return (f64::NAN, f64::NAN);
        }

        let avg = if use_weights {
            weighted_mean(&values, &weights)
        } else {
            arithmetic_mean(&values)
        };
        let stderr = population_std(&values) / (values.len() as f64).sqrt();
        (avg, stderr)
    }
}

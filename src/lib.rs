//! RONA: Risk of Non-Adaptedness
//!
//! This library estimates, for every population, how far its present allele
//! frequencies are from the frequencies a projected future environment would
//! predict. Each marker significantly associated with an environmental covariate
//! contributes a linear trend between the present covariate and its standardized
//! allele frequencies; the displacement implied by the future covariate values is
//! averaged across all markers of the covariate.
//!
//! The main components of this library are:
//! - `Rona`: The estimation pipeline
//! - `RonaConfig`: Scoring rule, outlier handling and weighting options
//! - `detect_outliers`, `fit_linear`, `score_marker`: The per-marker building blocks
//! - `CovariateAccumulator`: Per-covariate aggregation of marker scores
//! - `RonaResults`: Structure to hold and display the results
//! - `io`: Readers for BayPass and LFMM input and output files

mod accumulator;
mod config;
mod error;
pub mod io;
mod math;
mod outliers;
mod population;
mod results;
mod rona;
mod scorer;
mod trend;
mod utils;

pub use accumulator::{CovariateAccumulator, Reduction};
pub use config::{OutlierConfig, RonaConfig, ScoreRule};
pub use error::RonaError;
pub use outliers::{detect_outliers, detect_worst_outlier, mahalanobis_distances};
pub use population::{Association, CovariateTable, FrequencyTable, PopulationOrder};
pub use results::{CovariateResult, RonaResults};
pub use rona::Rona;
pub use scorer::{score_marker, MarkerScore};
pub use trend::{fit_linear, LinearFit};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RonaError {
    /// A vector does not line up with the population order
    #[error("Alignment error: {what} has {found} values but there are {expected} populations")]
    Alignment {
        what: String,
        found: usize,
        expected: usize,
    },
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Marker '{marker}' was added twice to covariate '{covariate}'")]
    DuplicateMarker { marker: String, covariate: String },
    #[error("Covariate '{0}' is not present in the environmental data")]
    UnknownCovariate(String),
    #[error("No allele frequencies were found for marker '{0}'")]
    MissingFrequencies(String),
}

impl RonaError {
    pub fn alignment(what: impl Into<String>, found: usize, expected: usize) -> Self {
        Self::Alignment {
            what: what.into(),
            found,
            expected,
        }
    }
}

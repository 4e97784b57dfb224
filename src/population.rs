use std::collections::HashMap;
use std::ops::Deref;

use derive_new::new;

use crate::error::RonaError;

/// The ordered population names every vector is aligned to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationOrder(Vec<String>);

impl PopulationOrder {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Fails with an alignment error unless `values` holds one entry per population
    pub fn check_aligned(&self, what: &str, values: &[f64]) -> Result<(), RonaError> {
        if values.len() == self.0.len() {
            Ok(())
        } else {
            Err(RonaError::alignment(what, values.len(), self.0.len()))
        }
    }
}

impl Deref for PopulationOrder {
    type Target = [String];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A marker whose frequencies were significantly explained by a covariate
#[derive(new, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Association {
    pub marker: String,
    pub covariate: String,
}

/// Environmental values keyed by covariate identifier
#[derive(Debug, Clone, Default)]
pub struct CovariateTable {
    ids: Vec<String>,
    values: HashMap<String, Vec<f64>>,
}

impl CovariateTable {
    /// Builds a table from one vector per covariate, numbered from 1 in input order
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Self {
        let mut table = Self::default();
        for (idx, column) in columns.into_iter().enumerate() {
            table.insert((idx + 1).to_string(), column);
        }
        table
    }

    pub fn insert(&mut self, id: String, values: Vec<f64>) {
        if self.values.insert(id.clone(), values).is_none() {
            self.ids.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.values.get(id).map(|v| v.as_slice())
    }

    /// Covariate identifiers in insertion order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Allele frequencies keyed by marker identifier
pub type FrequencyTable = HashMap<String, Vec<f64>>;

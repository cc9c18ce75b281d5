use std::fmt;

use serde::Serialize;

use crate::constants::{MIN_FEATURES, MIN_TRAINING_RECORDS};
use crate::error::{AdvisorError, AdvisorResult};
use crate::observation::{ObservationSeries, Variable};

/// Canonical features present in a series, in canonical order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSet(Vec<Variable>);

impl FeatureSet {
    /// Builds a feature set from an explicit list, enforcing the minimum size
    pub fn new(variables: Vec<Variable>) -> AdvisorResult<Self> {
        if variables.len() < MIN_FEATURES {
            return Err(AdvisorError::InsufficientFeatures {
                available: variables.len(),
                required: MIN_FEATURES,
            });
        }
        Ok(Self(variables))
    }

    pub fn variables(&self) -> &[Variable] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.0.iter().map(|v| v.code()).collect();
        f.write_str(&codes.join(", "))
    }
}

/// Selects the canonical features that at least one record of `series` carries
pub fn select_features(series: &ObservationSeries) -> AdvisorResult<FeatureSet> {
    if series.is_empty() {
        return Err(AdvisorError::EmptyDataset {
            usable: 0,
            required: MIN_TRAINING_RECORDS,
        });
    }

    let available: Vec<Variable> = Variable::FEATURES
        .into_iter()
        .filter(|&v| series.has_variable(v))
        .collect();

    tracing::debug!("Available features: {:?}", available);
    FeatureSet::new(available)
}

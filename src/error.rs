use chrono::NaiveDate;
use thiserror::Error;

use crate::observation::Variable;

/// Failures raised by the classification and recommendation pipeline.
///
/// Every variant describes a defect in the data handed to the pipeline, never a
/// transient fault, so none of them is worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvisorError {
    #[error("Not enough features: {available} canonical feature(s) present, at least {required} required")]
    InsufficientFeatures { available: usize, required: usize },

    #[error("Not enough usable records: {usable} after dropping incomplete days, at least {required} required")]
    EmptyDataset { usable: usize, required: usize },

    #[error("Observation dates must be strictly increasing: {current} follows {previous}")]
    UnorderedDates {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Record for {date} has no value for {variable}")]
    IncompleteRecord { date: NaiveDate, variable: Variable },

    #[error("Classifier was trained on [{trained}] but asked to score [{requested}]")]
    FeatureMismatch { trained: String, requested: String },
}

impl AdvisorError {
    /// Whether the error should be reported to the caller as bad input
    pub fn is_client_error(&self) -> bool {
        true
    }
}

/// Failures raised while fetching locations and climate records.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Request failed with status: {status}")]
    Upstream { status: reqwest::StatusCode },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid date '{value}': expected YYYYMMDD")]
    InvalidDate { value: String },

    #[error(transparent)]
    Advisor(#[from] AdvisorError),
}

impl ClientError {
    /// Whether the error was caused by the caller's input rather than the upstream services
    pub fn is_client_error(&self) -> bool {
        match self {
            ClientError::LocationNotFound(_) | ClientError::InvalidDate { .. } => true,
            ClientError::Advisor(e) => e.is_client_error(),
            ClientError::Upstream { status } => status.is_client_error(),
            ClientError::Http(_) => false,
        }
    }
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;

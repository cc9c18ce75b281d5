//! Crop condition advisor: trains a favorability classifier on a location's
//! recent NASA POWER climate records and turns unfavorable days into
//! per-variable field guidance, served over MCP.

pub mod advisor;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod features;
pub mod forest;
pub mod formatters;
pub mod labels;
pub mod models;
pub mod observation;
pub mod recommender;
pub mod service;
pub mod trainer;

pub use advisor::{advise, classify_latest, recommend, RecommendationResult};
pub use error::{AdvisorError, ClientError};
pub use features::{select_features, FeatureSet};
pub use labels::{label_of, Label};
pub use observation::{ObservationRecord, ObservationSeries, Variable};
pub use trainer::{train_classifier, TrainedClassifier, TrainingOutcome};

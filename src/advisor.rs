use chrono::NaiveDate;
use serde::Serialize;

use crate::constants::MIN_TRAINING_RECORDS;
use crate::error::{AdvisorError, AdvisorResult};
use crate::features::{select_features, FeatureSet};
use crate::labels::Label;
use crate::observation::{ObservationRecord, ObservationSeries};
use crate::recommender::{recommend_for_record, Recommendation};
use crate::trainer::{train_classifier, ClassificationReport, FeatureImportance, TrainedClassifier};

/// Outcome of scoring the latest observation of a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub predicted: Label,
    /// Date of the record that was scored
    pub scored_date: NaiveDate,
    /// Empty when the prediction is favorable
    pub recommendations: Vec<Recommendation>,
    /// Most important feature first
    pub feature_importances: Vec<FeatureImportance>,
    pub model_accuracy: f64,
    pub classification_report: ClassificationReport,
}

impl RecommendationResult {
    pub fn is_favorable(&self) -> bool {
        self.predicted == Label::Favorable
    }
}

/// Predicts the label of one record using the features the classifier was trained on
pub fn classify_latest(
    classifier: &TrainedClassifier,
    record: &ObservationRecord,
    features: &FeatureSet,
) -> AdvisorResult<Label> {
    if classifier.features() != features {
        return Err(AdvisorError::FeatureMismatch {
            trained: classifier.features().to_string(),
            requested: features.to_string(),
        });
    }

    let row = record
        .values_for(features.variables())
        .map_err(|variable| AdvisorError::IncompleteRecord {
            date: record.date,
            variable,
        })?;

    Ok(classifier.predict(&row))
}

/// Guidance for an unfavorable day; nothing for a favorable one
pub fn recommend(label: Label, record: &ObservationRecord) -> Vec<Recommendation> {
    match label {
        Label::Favorable => Vec::new(),
        Label::Unfavorable => recommend_for_record(record),
    }
}

/// Runs the whole pipeline on `series`: select, train, score the latest complete day, advise
pub fn advise(series: &ObservationSeries) -> AdvisorResult<RecommendationResult> {
    let features = select_features(series)?;
    let outcome = train_classifier(series, &features)?;

    let latest = series
        .latest_complete(features.variables())
        .ok_or(AdvisorError::EmptyDataset {
            usable: 0,
            required: MIN_TRAINING_RECORDS,
        })?;

    let predicted = classify_latest(&outcome.classifier, latest, &features)?;
    let recommendations = recommend(predicted, latest);

    tracing::info!(
        "Scored {} as {} with {} recommendation(s)",
        latest.date,
        predicted,
        recommendations.len()
    );

    Ok(RecommendationResult {
        predicted,
        scored_date: latest.date,
        recommendations,
        feature_importances: outcome.importances.ranked(),
        model_accuracy: outcome.accuracy,
        classification_report: outcome.report,
    })
}

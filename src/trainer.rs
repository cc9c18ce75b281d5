//! Fits a favorability classifier on one observation series and scores it on a held-out split.

use std::fmt;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::constants::{
    FAVORABLE_TEMPERATURE_THRESHOLD, MIN_FEATURES, MIN_TRAINING_RECORDS, N_ESTIMATORS,
    RANDOM_SEED, TEST_FRACTION,
};
use crate::error::{AdvisorError, AdvisorResult};
use crate::features::FeatureSet;
use crate::forest::RandomForest;
use crate::labels::{construct_labels, Label};
use crate::observation::{ObservationSeries, Variable};

/// Feature matrix and labels built from the complete records of a series
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Label>,
}

impl Dataset {
    /// Keeps labelled records carrying every feature; the rest are dropped
    pub fn from_series(series: &ObservationSeries, features: &FeatureSet) -> Self {
        let records = series.records();
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (date, label) in construct_labels(series, FAVORABLE_TEMPERATURE_THRESHOLD) {
            let Ok(pos) = records.binary_search_by_key(&date, |r| r.date) else {
                continue;
            };
            let Ok(row) = records[pos].values_for(features.variables()) else {
                continue;
            };
            x.push(row);
            y.push(label);
        }
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }
}

/// Shuffles `0..n` with `seed` and returns `(train, test)` with `ceil(n * test_fraction)` held out
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));
    let test = indices[..n_test].to_vec();
    let train = indices[n_test..].to_vec();
    (train, test)
}

/// Forest bound to the features it was trained on
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedClassifier {
    forest: RandomForest,
    features: FeatureSet,
}

impl TrainedClassifier {
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Predicts one row whose values follow [`Self::features`] order
    pub fn predict(&self, row: &[f64]) -> Label {
        self.forest.predict(row)
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub variable: Variable,
    pub importance: f64,
}

/// Importance per feature, in feature-set order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportances(Vec<FeatureImportance>);

impl FeatureImportances {
    fn new(features: &FeatureSet, scores: Vec<f64>) -> Self {
        Self(
            features
                .variables()
                .iter()
                .zip(scores)
                .map(|(&variable, importance)| FeatureImportance {
                    variable,
                    importance,
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureImportance> {
        self.0.iter()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|f| f.importance).sum()
    }

    /// Most important first; equal scores keep feature-set order
    pub fn ranked(&self) -> Vec<FeatureImportance> {
        let mut ranked = self.0.clone();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        ranked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall and F1 on the held-out split
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    pub fn from_predictions(truth: &[Label], predicted: &[Label]) -> Self {
        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();

        let classes = Label::ALL
            .into_iter()
            .map(|label| {
                let tp = truth
                    .iter()
                    .zip(predicted)
                    .filter(|(t, p)| **t == label && **p == label)
                    .count();
                let predicted_pos = predicted.iter().filter(|p| **p == label).count();
                let support = truth.iter().filter(|t| **t == label).count();

                let precision = ratio(tp, predicted_pos);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            classes,
            accuracy: ratio(correct, truth.len()),
            support: truth.len(),
        }
    }

    pub fn macro_avg(&self) -> (f64, f64, f64) {
        let n = self.classes.len() as f64;
        let sum = |f: fn(&ClassMetrics) -> f64| self.classes.iter().map(f).sum::<f64>() / n;
        (sum(|c| c.precision), sum(|c| c.recall), sum(|c| c.f1))
    }

    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        if self.support == 0 {
            return (0.0, 0.0, 0.0);
        }
        let total = self.support as f64;
        let sum = |f: fn(&ClassMetrics) -> f64| {
            self.classes
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / total
        };
        (sum(|c| c.precision), sum(|c| c.recall), sum(|c| c.f1))
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label.to_string(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        let (p, r, f1) = self.macro_avg();
        writeln!(
            f,
            "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "macro avg", p, r, f1, self.support
        )?;
        let (p, r, f1) = self.weighted_avg();
        write!(
            f,
            "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "weighted avg", p, r, f1, self.support
        )
    }
}

/// Everything produced by one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub classifier: TrainedClassifier,
    /// Fraction of held-out records classified correctly
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub importances: FeatureImportances,
    pub n_train: usize,
    pub n_test: usize,
}

/// Trains a forest on the complete records of `series` and evaluates it on a held-out fifth
pub fn train_classifier(
    series: &ObservationSeries,
    features: &FeatureSet,
) -> AdvisorResult<TrainingOutcome> {
    if features.len() < MIN_FEATURES {
        return Err(AdvisorError::InsufficientFeatures {
            available: features.len(),
            required: MIN_FEATURES,
        });
    }

    let dataset = Dataset::from_series(series, features);
    if dataset.len() < MIN_TRAINING_RECORDS {
        return Err(AdvisorError::EmptyDataset {
            usable: dataset.len(),
            required: MIN_TRAINING_RECORDS,
        });
    }

    let (train_idx, test_idx) = train_test_split(dataset.len(), TEST_FRACTION, RANDOM_SEED);
    let train = dataset.subset(&train_idx);
    let test = dataset.subset(&test_idx);

    let forest = RandomForest::fit(&train.x, &train.y, N_ESTIMATORS, RANDOM_SEED);
    let predicted: Vec<Label> = test.x.iter().map(|row| forest.predict(row)).collect();
    let report = ClassificationReport::from_predictions(&test.y, &predicted);
    let importances = FeatureImportances::new(features, forest.feature_importances());

    tracing::info!(
        "Trained {} trees on {} records ({} held out), accuracy {:.3}",
        forest.n_trees(),
        train.len(),
        test.len(),
        report.accuracy
    );

    Ok(TrainingOutcome {
        classifier: TrainedClassifier {
            forest,
            features: features.clone(),
        },
        accuracy: report.accuracy,
        report,
        importances,
        n_train: train.len(),
        n_test: test.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationRecord;
    use chrono::{Duration, NaiveDate};

    fn warm_and_cold_series(days: i64) -> ObservationSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records = (0..days)
            .map(|i| {
                let t = if i % 3 == 0 { 26.0 + (i % 4) as f64 } else { 12.0 - (i % 5) as f64 };
                ObservationRecord::new(start + Duration::days(i))
                    .with("T2M", t)
                    .with("T2M_MAX", t + 6.0)
                    .with("RH2M", 90.0 - t)
                    .with("WS2M", 1.5 + (i % 7) as f64 * 0.3)
            })
            .collect();
        ObservationSeries::new(records).unwrap()
    }

    fn features() -> FeatureSet {
        FeatureSet::new(vec![
            Variable::RelativeHumidity,
            Variable::WindSpeed,
            Variable::TemperatureMax,
        ])
        .unwrap()
    }

    #[test]
    fn test_split_sizes_follow_ceiling() {
        let (train, test) = train_test_split(10, 0.2, 42);
        assert_eq!((train.len(), test.len()), (8, 2));

        let (train, test) = train_test_split(11, 0.2, 42);
        assert_eq!((train.len(), test.len()), (8, 3));

        let (train, test) = train_test_split(2, 0.2, 42);
        assert_eq!((train.len(), test.len()), (1, 1));
    }

    #[test]
    fn test_split_is_a_permutation() {
        let (mut train, test) = train_test_split(25, 0.2, 42);
        train.extend(test);
        train.sort();
        assert_eq!(train, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_training_metrics_are_well_formed() {
        let outcome = train_classifier(&warm_and_cold_series(60), &features()).unwrap();

        assert!((0.0..=1.0).contains(&outcome.accuracy));
        assert!((outcome.importances.total() - 1.0).abs() < 1e-6);
        assert!(outcome.importances.iter().all(|f| f.importance >= 0.0));
        assert_eq!(outcome.n_train + outcome.n_test, 60);
        assert_eq!(outcome.n_test, 12);
        assert_eq!(outcome.classifier.n_trees(), N_ESTIMATORS);
    }

    #[test]
    fn test_training_is_reproducible() {
        let series = warm_and_cold_series(45);
        let a = train_classifier(&series, &features()).unwrap();
        let b = train_classifier(&series, &features()).unwrap();
        assert_eq!(a.accuracy, b.accuracy);
        assert_eq!(a.importances, b.importances);
        assert_eq!(a.report.to_string(), b.report.to_string());
    }

    #[test]
    fn test_rows_missing_target_or_features_are_dropped() {
        let d = |n| NaiveDate::from_ymd_opt(2024, 2, n).unwrap();
        let series = ObservationSeries::new(vec![
            ObservationRecord::new(d(1)).with("RH2M", 50.0).with("WS2M", 2.0),
            ObservationRecord::new(d(2)).with("T2M", 22.0).with("RH2M", 50.0),
            ObservationRecord::new(d(3))
                .with("T2M", 22.0)
                .with("RH2M", 50.0)
                .with("WS2M", 2.0),
        ])
        .unwrap();
        let features = FeatureSet::new(vec![Variable::RelativeHumidity, Variable::WindSpeed]).unwrap();

        assert_eq!(Dataset::from_series(&series, &features).len(), 1);
        assert_eq!(
            train_classifier(&series, &features).unwrap_err(),
            AdvisorError::EmptyDataset {
                usable: 1,
                required: 2
            }
        );
    }

    #[test]
    fn test_dataset_labels_follow_construct_labels() {
        let series = warm_and_cold_series(30);
        let dataset = Dataset::from_series(&series, &features());
        let labels: Vec<Label> = construct_labels(&series, FAVORABLE_TEMPERATURE_THRESHOLD)
            .into_iter()
            .map(|(_, label)| label)
            .collect();

        assert_eq!(dataset.len(), 30);
        assert_eq!(dataset.y, labels);
        assert!(dataset.y.contains(&Label::Favorable));
        assert!(dataset.y.contains(&Label::Unfavorable));
    }

    #[test]
    fn test_report_matches_hand_computed_metrics() {
        use Label::{Favorable as F, Unfavorable as U};
        let truth = [U, U, U, F, F];
        let predicted = [U, U, F, F, U];
        let report = ClassificationReport::from_predictions(&truth, &predicted);

        assert!((report.accuracy - 0.6).abs() < 1e-12);
        let unfavorable = report.classes[0];
        assert!((unfavorable.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((unfavorable.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(unfavorable.support, 3);
        let favorable = report.classes[1];
        assert!((favorable.precision - 0.5).abs() < 1e-12);
        assert!((favorable.recall - 0.5).abs() < 1e-12);

        let text = report.to_string();
        assert!(text.contains("unfavorable"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("0.60"));
    }

    #[test]
    fn test_ranked_importances_break_ties_by_feature_order() {
        let features = features();
        let importances = FeatureImportances::new(&features, vec![0.25, 0.5, 0.25]);
        let ranked: Vec<Variable> = importances.ranked().iter().map(|f| f.variable).collect();
        assert_eq!(
            ranked,
            vec![
                Variable::WindSpeed,
                Variable::RelativeHumidity,
                Variable::TemperatureMax
            ]
        );
    }
}

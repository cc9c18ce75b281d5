use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::constants::FAVORABLE_TEMPERATURE_THRESHOLD;
use crate::observation::{ObservationSeries, Variable};

/// Agronomic favorability of a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Unfavorable = 0,
    Favorable = 1,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Unfavorable, Label::Favorable];

    pub fn as_index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Unfavorable => f.write_str("unfavorable"),
            Label::Favorable => f.write_str("favorable"),
        }
    }
}

/// Label for a mean temperature, inclusive on the favorable side
pub fn label_of(temperature: f64) -> Label {
    label_with_threshold(temperature, FAVORABLE_TEMPERATURE_THRESHOLD)
}

pub fn label_with_threshold(temperature: f64, threshold: f64) -> Label {
    if temperature >= threshold {
        Label::Favorable
    } else {
        Label::Unfavorable
    }
}

/// One label per record that carries a target temperature; other records are dropped
pub fn construct_labels(series: &ObservationSeries, threshold: f64) -> Vec<(NaiveDate, Label)> {
    series
        .records()
        .iter()
        .filter_map(|r| {
            r.get(Variable::TARGET)
                .map(|t| (r.date, label_with_threshold(t, threshold)))
        })
        .collect()
}

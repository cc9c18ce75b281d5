//! Daily climate observations for a single location.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};

/// Canonical NASA POWER variable codes understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    /// Mean air temperature at 2 m (°C)
    #[serde(rename = "T2M")]
    Temperature,
    /// Maximum air temperature at 2 m (°C)
    #[serde(rename = "T2M_MAX")]
    TemperatureMax,
    /// Minimum air temperature at 2 m (°C)
    #[serde(rename = "T2M_MIN")]
    TemperatureMin,
    /// Corrected precipitation (mm/hr in the AG community)
    #[serde(rename = "PRECTOTCORR")]
    Precipitation,
    /// Relative humidity at 2 m (%)
    #[serde(rename = "RH2M")]
    RelativeHumidity,
    /// Wind speed at 2 m (m/s)
    #[serde(rename = "WS2M")]
    WindSpeed,
    /// All-sky surface shortwave downward irradiance (W/m²)
    #[serde(rename = "ALLSKY_SFC_SW_DWN")]
    SolarIrradiance,
    /// Surface pressure (kPa)
    #[serde(rename = "PS")]
    SurfacePressure,
    /// Specific humidity at 10 m (g/kg)
    #[serde(rename = "QV10M")]
    SpecificHumidity,
    /// Eastward wind at 10 m (m/s)
    #[serde(rename = "U10M")]
    WindU,
    /// Northward wind at 10 m (m/s)
    #[serde(rename = "V10M")]
    WindV,
}

impl Variable {
    /// Variables the classifier may train on, in canonical order
    pub const FEATURES: [Variable; 10] = [
        Variable::Precipitation,
        Variable::RelativeHumidity,
        Variable::WindSpeed,
        Variable::TemperatureMax,
        Variable::TemperatureMin,
        Variable::SurfacePressure,
        Variable::SpecificHumidity,
        Variable::WindU,
        Variable::WindV,
        Variable::SolarIrradiance,
    ];

    /// Variable the favorability label is derived from
    pub const TARGET: Variable = Variable::Temperature;

    pub fn code(self) -> &'static str {
        match self {
            Variable::Temperature => "T2M",
            Variable::TemperatureMax => "T2M_MAX",
            Variable::TemperatureMin => "T2M_MIN",
            Variable::Precipitation => "PRECTOTCORR",
            Variable::RelativeHumidity => "RH2M",
            Variable::WindSpeed => "WS2M",
            Variable::SolarIrradiance => "ALLSKY_SFC_SW_DWN",
            Variable::SurfacePressure => "PS",
            Variable::SpecificHumidity => "QV10M",
            Variable::WindU => "U10M",
            Variable::WindV => "V10M",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Variable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        std::iter::once(Variable::TARGET)
            .chain(Variable::FEATURES)
            .find(|v| v.code() == s)
            .ok_or_else(|| format!("unknown variable code: {}", s))
    }
}

/// One day of measurements at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub date: NaiveDate,
    /// Measurements keyed by variable code; may include codes outside [`Variable`]
    pub values: BTreeMap<String, f64>,
}

impl ObservationRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert used when assembling records by hand
    pub fn with(mut self, code: impl Into<String>, value: f64) -> Self {
        self.values.insert(code.into(), value);
        self
    }

    /// Value of a canonical variable. Non-finite values count as missing.
    pub fn get(&self, variable: Variable) -> Option<f64> {
        self.values
            .get(variable.code())
            .copied()
            .filter(|v| v.is_finite())
    }

    pub fn has(&self, variable: Variable) -> bool {
        self.get(variable).is_some()
    }

    /// Values for `variables` in the given order, or the first variable that is missing
    pub fn values_for(&self, variables: &[Variable]) -> Result<Vec<f64>, Variable> {
        variables
            .iter()
            .map(|&v| self.get(v).ok_or(v))
            .collect()
    }
}

/// Chronologically ordered observations for one location and date range
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObservationSeries {
    records: Vec<ObservationRecord>,
}

impl ObservationSeries {
    /// Wraps `records`, rejecting duplicate or out-of-order dates
    pub fn new(records: Vec<ObservationRecord>) -> AdvisorResult<Self> {
        for pair in records.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AdvisorError::UnorderedDates {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Whether any record carries a usable value for `variable`
    pub fn has_variable(&self, variable: Variable) -> bool {
        self.records.iter().any(|r| r.has(variable))
    }

    /// Latest record carrying every variable in `variables`
    pub fn latest_complete(&self, variables: &[Variable]) -> Option<&ObservationRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| variables.iter().all(|&v| r.has(v)))
    }

    /// Arithmetic mean of `variable` over the records that carry it
    pub fn mean(&self, variable: Variable) -> Option<f64> {
        let values: Vec<f64> = self.records.iter().filter_map(|r| r.get(variable)).collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

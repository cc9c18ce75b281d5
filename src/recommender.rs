//! Threshold rules turning a single measurement into field guidance.
//!
//! Each variable has an ordered rule table; the first rule whose predicate
//! accepts the value wins. Values no rule accepts (gaps between bands,
//! out-of-range inputs, NaN) get the variable's "enter a valid value" message
//! instead of an error, so one bad reading never hides the other four.
//!
//! Some bands are kept exactly as agronomists wrote them even though they
//! cannot fire: wind speeds in `[60, 70)` and `[90, 100)` km/h fall through,
//! and the `[120, 250]` km/h band is shadowed by the `>= 100` band above it.

use std::fmt;

use serde::Serialize;

use crate::constants::MS_TO_KMH;
use crate::observation::{ObservationRecord, Variable};

/// Severity attached to a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
    VeryExtreme,
    Invalid,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::Low => "low",
            Grade::Moderate => "moderate",
            Grade::High => "high",
            Grade::VeryHigh => "very high",
            Grade::Extreme => "extreme",
            Grade::VeryExtreme => "very extreme",
            Grade::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// One band of a rule table
#[derive(Clone, Copy)]
pub struct Rule {
    pub matches: fn(f64) -> bool,
    pub grade: Grade,
    pub message: &'static str,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("grade", &self.grade)
            .field("message", &self.message)
            .finish()
    }
}

/// Wind rules, evaluated on km/h
pub const WIND_RULES: &[Rule] = &[
    Rule {
        matches: |v| (0.0..50.0).contains(&v),
        grade: Grade::Moderate,
        message: "Light to moderate wind speed: Monitor for light erosion and protect sensitive crops.",
    },
    Rule {
        matches: |v| (50.0..60.0).contains(&v),
        grade: Grade::High,
        message: "Moderate to strong wind speed: Check for damage and use windbreaks.",
    },
    Rule {
        matches: |v| (70.0..90.0).contains(&v),
        grade: Grade::VeryHigh,
        message: "Strong wind speed: Expect crop damage. Take immediate action to secure plants.",
    },
    Rule {
        matches: |v| v >= 100.0,
        grade: Grade::Extreme,
        message: "Extreme wind speed: Prepare for significant erosion and evacuate at-risk crops.",
    },
    Rule {
        matches: |v| (120.0..=250.0).contains(&v),
        grade: Grade::VeryExtreme,
        message: "Very extreme: Catastrophic damage possible. Take emergency measures and evacuate.",
    },
];

pub const HUMIDITY_RULES: &[Rule] = &[
    Rule {
        matches: |v| v == 100.0,
        grade: Grade::Extreme,
        message: "Extreme humidity: Expect soil saturation and possible flooding. Monitor for soil erosion and root rot.",
    },
    Rule {
        matches: |v| v > 80.0 && v < 100.0,
        grade: Grade::High,
        message: "High humidity: Significant moisture retention may lead to fungal growth. Improve drainage and monitor plants.",
    },
    Rule {
        matches: |v| (50.0..=80.0).contains(&v),
        grade: Grade::Moderate,
        message: "Moderate humidity: Generally favorable for growth. Maintain regular watering and check soil moisture.",
    },
    Rule {
        matches: |v| v < 50.0,
        grade: Grade::Low,
        message: "Low humidity: Soil moisture may evaporate quickly. Increase irrigation to support crop growth.",
    },
];

pub const SOLAR_RULES: &[Rule] = &[
    Rule {
        matches: |v| v >= 1000.0,
        grade: Grade::Extreme,
        message: "Extreme radiation: High temperatures expected. Increase irrigation and provide shade.",
    },
    Rule {
        matches: |v| (900.0..1000.0).contains(&v),
        grade: Grade::High,
        message: "High radiation: Monitor soil moisture and water crops adequately.",
    },
    Rule {
        matches: |v| (700.0..900.0).contains(&v),
        grade: Grade::Moderate,
        message: "Moderate radiation: Suitable for growth. Regularly irrigate and check for heat stress.",
    },
    Rule {
        matches: |v| v < 700.0,
        grade: Grade::Low,
        message: "Low radiation: Ensure adequate sunlight and consider supplemental lighting.",
    },
];

pub const PRECIPITATION_RULES: &[Rule] = &[
    Rule {
        matches: |v| v > 2.0,
        grade: Grade::Extreme,
        message: "Extreme precipitation: Rapid erosion and waterlogging expected. Manage drainage to prevent flooding.",
    },
    Rule {
        matches: |v| (1.0..=2.0).contains(&v),
        grade: Grade::High,
        message: "High precipitation: Risk of flash flooding. Monitor drainage and prepare for runoff.",
    },
    Rule {
        matches: |v| (0.5..1.0).contains(&v),
        grade: Grade::Moderate,
        message: "Moderate precipitation: Monitor soil saturation and prepare for localized flooding.",
    },
    Rule {
        matches: |v| v < 0.5,
        grade: Grade::Low,
        message: "Low precipitation: Favorable for planting. Consider irrigation if moisture drops.",
    },
];

pub const TEMPERATURE_RULES: &[Rule] = &[
    Rule {
        matches: |v| v > 70.0,
        grade: Grade::Extreme,
        message: "Extreme: High risk of land degradation. Increase irrigation and provide shade.",
    },
    Rule {
        matches: |v| v > 60.0 && v <= 70.0,
        grade: Grade::High,
        message: "High: Expect rapid soil drying. Monitor moisture and reduce water loss.",
    },
    Rule {
        matches: |v| v > 50.0 && v <= 60.0,
        grade: Grade::VeryHigh,
        message: "Very high: Soil may crack. Increase irrigation and consider mulching.",
    },
    Rule {
        matches: |v| v > 40.0 && v <= 50.0,
        grade: Grade::High,
        message: "High: Increased evaporation. Monitor for water stress and adjust watering.",
    },
    Rule {
        matches: |v| v <= 40.0,
        grade: Grade::Moderate,
        message: "Moderate: Generally manageable for growth. Continue regular irrigation.",
    },
];

/// Variables that receive guidance, in the order recommendations are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedVariable {
    WindSpeed,
    Humidity,
    SolarRadiation,
    Precipitation,
    Temperature,
}

impl TrackedVariable {
    pub const ORDER: [TrackedVariable; 5] = [
        TrackedVariable::WindSpeed,
        TrackedVariable::Humidity,
        TrackedVariable::SolarRadiation,
        TrackedVariable::Precipitation,
        TrackedVariable::Temperature,
    ];

    /// Record column the measurement is read from
    pub fn source(self) -> Variable {
        match self {
            TrackedVariable::WindSpeed => Variable::WindSpeed,
            TrackedVariable::Humidity => Variable::RelativeHumidity,
            TrackedVariable::SolarRadiation => Variable::SolarIrradiance,
            TrackedVariable::Precipitation => Variable::Precipitation,
            TrackedVariable::Temperature => Variable::TemperatureMax,
        }
    }

    pub fn rules(self) -> &'static [Rule] {
        match self {
            TrackedVariable::WindSpeed => WIND_RULES,
            TrackedVariable::Humidity => HUMIDITY_RULES,
            TrackedVariable::SolarRadiation => SOLAR_RULES,
            TrackedVariable::Precipitation => PRECIPITATION_RULES,
            TrackedVariable::Temperature => TEMPERATURE_RULES,
        }
    }

    pub fn invalid_message(self) -> &'static str {
        match self {
            TrackedVariable::WindSpeed => "Please enter a valid wind speed.",
            TrackedVariable::Humidity => "Please enter a valid relative humidity percentage.",
            TrackedVariable::SolarRadiation => "Enter a valid solar irradiance value.",
            TrackedVariable::Precipitation => "Enter a valid precipitation rate.",
            TrackedVariable::Temperature => "Enter a valid temperature value.",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            TrackedVariable::WindSpeed => "m/s",
            TrackedVariable::Humidity => "%",
            TrackedVariable::SolarRadiation => "W/m²",
            TrackedVariable::Precipitation => "mm/hr",
            TrackedVariable::Temperature => "°C",
        }
    }

    /// Grades a raw measurement in the units it is recorded in
    pub fn evaluate(self, value: f64) -> Recommendation {
        let banded = match self {
            TrackedVariable::WindSpeed => value * MS_TO_KMH,
            _ => value,
        };
        let (grade, message) = match first_match(self.rules(), banded) {
            Some(rule) => (rule.grade, rule.message),
            None => (Grade::Invalid, self.invalid_message()),
        };
        Recommendation {
            variable: self,
            value,
            grade,
            message,
        }
    }
}

impl fmt::Display for TrackedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackedVariable::WindSpeed => "Wind speed",
            TrackedVariable::Humidity => "Humidity",
            TrackedVariable::SolarRadiation => "Solar radiation",
            TrackedVariable::Precipitation => "Precipitation",
            TrackedVariable::Temperature => "Temperature",
        };
        f.write_str(s)
    }
}

/// Guidance for one measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub variable: TrackedVariable,
    /// Measurement as recorded (wind in m/s)
    pub value: f64,
    pub grade: Grade,
    pub message: &'static str,
}

pub fn first_match(rules: &'static [Rule], value: f64) -> Option<&'static Rule> {
    rules.iter().find(|rule| (rule.matches)(value))
}

/// Wind speed in m/s
pub fn wind_speed_recommendation(wind_speed: f64) -> &'static str {
    TrackedVariable::WindSpeed.evaluate(wind_speed).message
}

/// Relative humidity in percent
pub fn humidity_recommendation(relative_humidity: f64) -> &'static str {
    TrackedVariable::Humidity.evaluate(relative_humidity).message
}

/// Solar irradiance in W/m²
pub fn solar_radiation_recommendation(solar_irradiance: f64) -> &'static str {
    TrackedVariable::SolarRadiation.evaluate(solar_irradiance).message
}

/// Precipitation rate in mm/hr
pub fn precipitation_recommendation(precipitation_rate: f64) -> &'static str {
    TrackedVariable::Precipitation.evaluate(precipitation_rate).message
}

/// Temperature in °C
pub fn temperature_recommendation(temperature: f64) -> &'static str {
    TrackedVariable::Temperature.evaluate(temperature).message
}

/// Recommendations for every tracked variable present in `record`, in [`TrackedVariable::ORDER`]
pub fn recommend_for_record(record: &ObservationRecord) -> Vec<Recommendation> {
    TrackedVariable::ORDER
        .into_iter()
        .filter_map(|tracked| record.get(tracked.source()).map(|v| tracked.evaluate(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(variable: TrackedVariable, value: f64) -> Grade {
        variable.evaluate(value).grade
    }

    #[test]
    fn test_wind_bands() {
        assert!(wind_speed_recommendation(13.6).starts_with("Light to moderate"));
        assert!(wind_speed_recommendation(0.0).starts_with("Light to moderate"));
        // 15 m/s = 54 km/h
        assert!(wind_speed_recommendation(15.0).starts_with("Moderate to strong"));
        // 22 m/s = 79.2 km/h
        assert!(wind_speed_recommendation(22.0).starts_with("Strong wind"));
        // 30 m/s = 108 km/h
        assert!(wind_speed_recommendation(30.0).starts_with("Extreme wind"));
    }

    #[test]
    fn test_wind_gaps_fall_through() {
        // 16.67 m/s = 60.012 km/h
        assert_eq!(wind_speed_recommendation(16.67), "Please enter a valid wind speed.");
        // 26 m/s = 93.6 km/h
        assert_eq!(grade(TrackedVariable::WindSpeed, 26.0), Grade::Invalid);
        assert_eq!(grade(TrackedVariable::WindSpeed, -1.0), Grade::Invalid);
        assert_eq!(grade(TrackedVariable::WindSpeed, f64::NAN), Grade::Invalid);
    }

    #[test]
    fn test_very_extreme_wind_is_shadowed() {
        // 50 m/s = 180 km/h, inside [120, 250] but caught by >= 100 first
        assert_eq!(grade(TrackedVariable::WindSpeed, 50.0), Grade::Extreme);
        assert!(WIND_RULES
            .iter()
            .any(|r| r.grade == Grade::VeryExtreme));
    }

    #[test]
    fn test_humidity_bands() {
        assert_eq!(grade(TrackedVariable::Humidity, 100.0), Grade::Extreme);
        assert_eq!(grade(TrackedVariable::Humidity, 99.9), Grade::High);
        assert_eq!(grade(TrackedVariable::Humidity, 80.1), Grade::High);
        assert_eq!(grade(TrackedVariable::Humidity, 80.0), Grade::Moderate);
        assert_eq!(grade(TrackedVariable::Humidity, 50.0), Grade::Moderate);
        assert_eq!(grade(TrackedVariable::Humidity, 49.9), Grade::Low);
        assert_eq!(
            humidity_recommendation(100.5),
            "Please enter a valid relative humidity percentage."
        );
    }

    #[test]
    fn test_solar_bands() {
        assert_eq!(grade(TrackedVariable::SolarRadiation, 1000.0), Grade::Extreme);
        assert_eq!(grade(TrackedVariable::SolarRadiation, 999.0), Grade::High);
        assert_eq!(grade(TrackedVariable::SolarRadiation, 900.0), Grade::High);
        assert_eq!(grade(TrackedVariable::SolarRadiation, 700.0), Grade::Moderate);
        assert_eq!(grade(TrackedVariable::SolarRadiation, 250.0), Grade::Low);
        assert_eq!(
            solar_radiation_recommendation(f64::NAN),
            "Enter a valid solar irradiance value."
        );
    }

    #[test]
    fn test_precipitation_bands() {
        assert!(precipitation_recommendation(2.0).starts_with("High precipitation"));
        assert!(precipitation_recommendation(2.01).starts_with("Extreme precipitation"));
        assert!(precipitation_recommendation(1.0).starts_with("High precipitation"));
        assert!(precipitation_recommendation(0.5).starts_with("Moderate precipitation"));
        assert!(precipitation_recommendation(0.49).starts_with("Low precipitation"));
    }

    #[test]
    fn test_temperature_bands() {
        assert_eq!(grade(TrackedVariable::Temperature, 70.5), Grade::Extreme);
        assert!(temperature_recommendation(70.0).starts_with("High: Expect rapid soil drying"));
        assert_eq!(grade(TrackedVariable::Temperature, 60.0), Grade::VeryHigh);
        assert!(temperature_recommendation(50.0).starts_with("High: Increased evaporation"));
        assert_eq!(grade(TrackedVariable::Temperature, 40.0), Grade::Moderate);
        assert_eq!(grade(TrackedVariable::Temperature, -15.0), Grade::Moderate);
        assert_eq!(
            temperature_recommendation(f64::NAN),
            "Enter a valid temperature value."
        );
    }

    #[test]
    fn test_wind_value_is_reported_in_source_units() {
        let rec = TrackedVariable::WindSpeed.evaluate(13.6);
        assert_eq!(rec.value, 13.6);
        assert_eq!(rec.grade, Grade::Moderate);
    }
}

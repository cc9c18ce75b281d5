use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::NASA_POWER_FILL_VALUE;

// ============================================================================
// NASA POWER API Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PowerResponse {
    #[serde(default)]
    pub header: PowerHeader,
    pub properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
pub struct PowerHeader {
    #[serde(default = "default_fill_value")]
    pub fill_value: f64,
}

impl Default for PowerHeader {
    fn default() -> Self {
        Self {
            fill_value: NASA_POWER_FILL_VALUE,
        }
    }
}

fn default_fill_value() -> f64 {
    NASA_POWER_FILL_VALUE
}

#[derive(Debug, Deserialize)]
pub struct PowerProperties {
    /// Parameter code -> (YYYYMMDD -> value)
    pub parameter: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

// ============================================================================
// OpenCage Geocoding API Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResult {
    pub geometry: Geometry,
    #[serde(default)]
    pub formatted: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    pub lat: f64,
    pub lng: f64,
}

/// Resolved point a climate series is fetched for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

// ============================================================================
// MCP Tool Request Models
// ============================================================================

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GeocodeRequest {
    /// Place name, e.g. "Nairobi" or "Fresno, CA"
    pub location: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ClimateDataRequest {
    pub location: String,
    /// First day, YYYYMMDD
    pub start_date: Option<String>,
    /// Last day, YYYYMMDD
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RecommendationRequest {
    pub location: String,
    /// Grower's name, used to personalise the reply
    pub name: Option<String>,
    /// First day, YYYYMMDD
    pub start_date: Option<String>,
    /// Last day, YYYYMMDD
    pub end_date: Option<String>,
}

/// One day of caller-supplied observations
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RecordInput {
    /// Day, YYYYMMDD
    pub date: String,
    /// Variable code (e.g. "T2M", "RH2M", "WS2M") -> value
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RecordsRecommendationRequest {
    /// Daily records in strictly increasing date order
    pub records: Vec<RecordInput>,
    /// Grower's name, used to personalise the reply
    pub name: Option<String>,
    /// Place or field the records describe
    pub label: Option<String>,
}

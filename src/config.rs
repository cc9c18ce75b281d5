//! Configuration for the upstream data services.
//!
//! Loaded in layers:
//! 1. Defaults in code
//! 2. Optional `config/advisor.toml`
//! 3. Environment variables with the `CROP_ADVISOR__` prefix
//!    (e.g. `CROP_ADVISOR__OPENCAGE__API_KEY`)

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use crate::constants::{NASA_POWER_API_BASE, NASA_POWER_COMMUNITY, OPENCAGE_API_BASE};

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorConfig {
    pub opencage: OpenCageConfig,

    pub nasa_power: NasaPowerConfig,

    /// Days of history fetched when a request gives no explicit window
    pub lookback_days: i64,

    /// Timeout applied to every upstream HTTP request
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenCageConfig {
    /// OpenCage API key
    pub api_key: String,

    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NasaPowerConfig {
    pub base_url: String,

    /// Community whose units the parameters are reported in
    pub community: String,

    /// Site elevation in metres sent with every request
    pub site_elevation: f64,
}

impl AdvisorConfig {
    /// Load configuration from defaults, file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .set_default("opencage.base_url", OPENCAGE_API_BASE)?
            .set_default("nasa_power.base_url", NASA_POWER_API_BASE)?
            .set_default("nasa_power.community", NASA_POWER_COMMUNITY)?
            .set_default("nasa_power.site_elevation", 35.0)?
            .set_default("lookback_days", 30)?
            .set_default("request_timeout_secs", 30)?
            .add_source(File::with_name("config/advisor").required(false))
            .add_source(
                Environment::with_prefix("CROP_ADVISOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration with every default and the given OpenCage key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            opencage: OpenCageConfig {
                api_key: api_key.into(),
                base_url: OPENCAGE_API_BASE.to_string(),
            },
            nasa_power: NasaPowerConfig {
                base_url: NASA_POWER_API_BASE.to_string(),
                community: NASA_POWER_COMMUNITY.to_string(),
                site_elevation: 35.0,
            },
            lookback_days: 30,
            request_timeout_secs: 30,
        }
    }
}

//! HTTP access to OpenCage (geocoding) and NASA POWER (daily climate records).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::AdvisorConfig;
use crate::constants::{NASA_POWER_PARAMETERS, POWER_DATE_FORMAT, USER_AGENT};
use crate::error::ClientError;
use crate::models::{GeocodeResponse, Location, PowerResponse, RecordInput};
use crate::observation::{ObservationRecord, ObservationSeries};

/// Fetches locations and climate series for the advisor
#[derive(Clone)]
pub struct ClimateClient {
    client: Arc<Client>,
    config: Arc<AdvisorConfig>,
}

impl ClimateClient {
    /// Creates a client bound to `config`
    pub fn new(config: AdvisorConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Makes an HTTP GET request and deserializes the JSON response
    async fn make_request<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Upstream {
                status: response.status(),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Resolves a place name to the coordinates of its best match
    pub async fn geocode(&self, location: &str) -> Result<Location, ClientError> {
        tracing::info!("Geocoding location: {}", location);

        let response = self
            .make_request::<GeocodeResponse>(
                &self.config.opencage.base_url,
                &[
                    ("q", location.to_string()),
                    ("key", self.config.opencage.api_key.clone()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        let first = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::LocationNotFound(location.to_string()))?;

        Ok(Location {
            name: first.formatted.unwrap_or_else(|| location.to_string()),
            latitude: first.geometry.lat,
            longitude: first.geometry.lng,
        })
    }

    /// Daily observations for `location` between `start` and `end`, inclusive
    pub async fn daily_series(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ObservationSeries, ClientError> {
        tracing::info!(
            "Fetching NASA POWER data for {:.4}, {:.4} from {} to {}",
            location.latitude,
            location.longitude,
            start,
            end
        );

        let power = &self.config.nasa_power;
        let response = self
            .make_request::<PowerResponse>(
                &power.base_url,
                &[
                    ("start", start.format(POWER_DATE_FORMAT).to_string()),
                    ("end", end.format(POWER_DATE_FORMAT).to_string()),
                    ("latitude", location.latitude.to_string()),
                    ("longitude", location.longitude.to_string()),
                    ("parameters", NASA_POWER_PARAMETERS.to_string()),
                    ("community", power.community.clone()),
                    ("format", "JSON".to_string()),
                    ("site-elevation", power.site_elevation.to_string()),
                ],
            )
            .await?;

        let series = series_from_power(response)?;
        tracing::debug!("Received {} daily records", series.len());
        Ok(series)
    }
}

/// Pivots the parameter-major POWER table into date-ordered records, dropping fill values
pub fn series_from_power(response: PowerResponse) -> Result<ObservationSeries, ClientError> {
    let fill_value = response.header.fill_value;
    let mut by_date: BTreeMap<NaiveDate, ObservationRecord> = BTreeMap::new();

    for (code, values) in response.properties.parameter {
        for (raw_date, value) in values {
            let date = parse_power_date(&raw_date)?;
            let record = by_date
                .entry(date)
                .or_insert_with(|| ObservationRecord::new(date));
            if let Some(v) = value.filter(|v| *v != fill_value && v.is_finite()) {
                record.values.insert(code.clone(), v);
            }
        }
    }

    Ok(ObservationSeries::new(by_date.into_values().collect())?)
}

/// Validates caller-supplied records into a series; dates must be strictly increasing
pub fn series_from_records(inputs: Vec<RecordInput>) -> Result<ObservationSeries, ClientError> {
    let records = inputs
        .into_iter()
        .map(|input| {
            let date = parse_power_date(&input.date)?;
            Ok(ObservationRecord {
                date,
                values: input.values,
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;

    Ok(ObservationSeries::new(records)?)
}

/// Parses a `YYYYMMDD` date
pub fn parse_power_date(value: &str) -> Result<NaiveDate, ClientError> {
    NaiveDate::parse_from_str(value, POWER_DATE_FORMAT).map_err(|_| ClientError::InvalidDate {
        value: value.to_string(),
    })
}

/// Window to fetch: explicit dates when given, otherwise `lookback_days` ending `today`
pub fn date_window(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
    lookback_days: i64,
) -> Result<(NaiveDate, NaiveDate), ClientError> {
    let end = match end {
        Some(raw) => parse_power_date(raw)?,
        None => today,
    };
    let start = match start {
        Some(raw) => parse_power_date(raw)?,
        None => end - chrono::Duration::days(lookback_days),
    };
    if start > end {
        return Err(ClientError::InvalidDate {
            value: format!("{} is after {}", start.format(POWER_DATE_FORMAT), end.format(POWER_DATE_FORMAT)),
        });
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::observation::Variable;

    fn power_fixture() -> PowerResponse {
        serde_json::from_str(
            r#"{
                "header": { "title": "NASA/POWER", "fill_value": -999.0 },
                "properties": {
                    "parameter": {
                        "T2M": { "20240102": 21.5, "20240101": 18.25 },
                        "RH2M": { "20240101": 74.1, "20240102": -999.0 },
                        "WS2M": { "20240101": 2.3, "20240102": null }
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_power_table_is_pivoted_by_date() {
        let series = series_from_power(power_fixture()).unwrap();
        assert_eq!(series.len(), 2);

        let first = &series.records()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.get(Variable::Temperature), Some(18.25));
        assert_eq!(first.get(Variable::RelativeHumidity), Some(74.1));

        let second = &series.records()[1];
        assert_eq!(second.get(Variable::Temperature), Some(21.5));
        assert_eq!(second.get(Variable::RelativeHumidity), None);
        assert_eq!(second.get(Variable::WindSpeed), None);
    }

    #[test]
    fn test_missing_header_uses_default_fill_value() {
        let response: PowerResponse = serde_json::from_str(
            r#"{ "properties": { "parameter": { "PS": { "20240301": -999.0 } } } }"#,
        )
        .unwrap();
        let series = series_from_power(response).unwrap();
        assert_eq!(series.records()[0].get(Variable::SurfacePressure), None);
    }

    #[test]
    fn test_bad_date_key_is_rejected() {
        let response: PowerResponse = serde_json::from_str(
            r#"{ "properties": { "parameter": { "PS": { "2024-03-01": 101.0 } } } }"#,
        )
        .unwrap();
        assert!(matches!(
            series_from_power(response),
            Err(ClientError::InvalidDate { .. })
        ));
    }

    fn record_inputs(days: u32) -> Vec<RecordInput> {
        (1..=days)
            .map(|day| {
                let t = if day % 2 == 0 { 25.0 } else { 12.0 };
                RecordInput {
                    date: format!("202406{:02}", day),
                    values: BTreeMap::from([
                        ("T2M".to_string(), t),
                        ("T2M_MAX".to_string(), t + 6.0),
                        ("RH2M".to_string(), 90.0 - t),
                        ("WS2M".to_string(), 2.0),
                        ("PRECTOTCORR".to_string(), 0.4),
                    ]),
                }
            })
            .collect()
    }

    #[test]
    fn test_supplied_records_are_advised() {
        let series = series_from_records(record_inputs(12)).unwrap();
        assert_eq!(series.len(), 12);
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 6, 12));

        let result = crate::advisor::advise(&series).unwrap();
        assert_eq!(result.scored_date, NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
        assert!((0.0..=1.0).contains(&result.model_accuracy));
    }

    #[test]
    fn test_supplied_records_out_of_order_are_rejected() {
        let mut inputs = record_inputs(5);
        inputs.swap(1, 2);
        let err = series_from_records(inputs).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Advisor(AdvisorError::UnorderedDates { .. })
        ));
        assert!(err.is_client_error());

        let mut duplicated = record_inputs(3);
        duplicated[2].date = duplicated[1].date.clone();
        assert!(series_from_records(duplicated).is_err());
    }

    #[test]
    fn test_supplied_record_with_bad_date_is_rejected() {
        let mut inputs = record_inputs(3);
        inputs[0].date = "2024-06-01".to_string();
        assert!(matches!(
            series_from_records(inputs),
            Err(ClientError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_records_request_parses_from_json() {
        let request: crate::models::RecordsRecommendationRequest = serde_json::from_str(
            r#"{ "records": [ { "date": "20240601", "values": { "T2M": 21.0, "RH2M": 55.0 } } ], "name": "Ana" }"#,
        )
        .unwrap();
        assert_eq!(request.records.len(), 1);
        assert_eq!(request.name.as_deref(), Some("Ana"));
        assert!(request.label.is_none());
        let series = series_from_records(request.records).unwrap();
        assert_eq!(series.records()[0].get(Variable::Temperature), Some(21.0));
    }

    #[test]
    fn test_default_window_looks_back_from_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let (start, end) = date_window(None, None, today, 30).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(end, today);
    }

    #[test]
    fn test_explicit_window_is_validated() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let (start, end) = date_window(Some("20240101"), Some("20240110"), today, 30).unwrap();
        assert_eq!(start.to_string(), "2024-01-01");
        assert_eq!(end.to_string(), "2024-01-10");

        let err = date_window(Some("20240111"), Some("20240110"), today, 30).unwrap_err();
        assert!(err.is_client_error());
        assert!(date_window(Some("Jan 1"), None, today, 30).is_err());
    }

    #[test]
    fn test_client_builds_from_config() {
        let client = ClimateClient::new(AdvisorConfig::with_api_key("test-key")).unwrap();
        assert_eq!(client.config().opencage.api_key, "test-key");
        assert_eq!(client.config().lookback_days, 30);
    }
}

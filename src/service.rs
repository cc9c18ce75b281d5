use anyhow::Result;
use chrono::Local;
use rmcp::{
    handler::server::{wrapper::Parameters, ServerHandler, tool::ToolRouter},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    ErrorData as McpError,
};

use crate::advisor::{advise, RecommendationResult};
use crate::client::{date_window, series_from_records, ClimateClient};
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, ClientError};
use crate::formatters::{format_climate_summary, format_location, format_recommendations};
use crate::models::{
    ClimateDataRequest, GeocodeRequest, Location, RecommendationRequest, RecordsRecommendationRequest,
};
use crate::observation::ObservationSeries;

/// Crop advisory service that handles MCP requests
#[derive(Clone)]
pub struct CropAdvisor {
    client: ClimateClient,
    tool_router: ToolRouter<Self>,
}

fn client_error(context: &str, e: ClientError) -> McpError {
    if e.is_client_error() {
        McpError::invalid_params(format!("{}: {}", context, e), None)
    } else {
        McpError::internal_error(format!("{}: {}", context, e), None)
    }
}

fn advisor_error(e: AdvisorError) -> McpError {
    McpError::invalid_params(e.to_string(), None)
}

/// Trains off the async runtime; the forest fit is CPU-bound
async fn advise_in_background(series: ObservationSeries) -> Result<RecommendationResult, McpError> {
    tokio::task::spawn_blocking(move || advise(&series))
        .await
        .map_err(|e| McpError::internal_error(format!("Training task failed: {}", e), None))?
        .map_err(advisor_error)
}

impl CropAdvisor {
    /// Creates a new CropAdvisor service instance
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        let client = ClimateClient::new(config)?;

        Ok(Self {
            client,
            tool_router: Self::tool_router(),
        })
    }

    /// Geocodes `location` and fetches its climate series for the requested window
    async fn fetch_series(
        &self,
        location: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<(Location, ObservationSeries), McpError> {
        let (start, end) = date_window(
            start_date,
            end_date,
            Local::now().date_naive(),
            self.client.config().lookback_days,
        )
        .map_err(|e| client_error("Invalid date range", e))?;

        let resolved = self
            .client
            .geocode(location)
            .await
            .map_err(|e| client_error("Failed to geocode location", e))?;

        let series = self
            .client
            .daily_series(&resolved, start, end)
            .await
            .map_err(|e| client_error("Failed to fetch NASA POWER data", e))?;

        Ok((resolved, series))
    }
}

#[tool_handler]
impl ServerHandler for CropAdvisor {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-crop-advisor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some(
                "A crop care advisor powered by NASA POWER daily climate data. \
                Classifies recent conditions as favorable or unfavorable and gives \
                guidance on wind, humidity, solar radiation, precipitation and temperature."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl CropAdvisor {
    /// Resolves a place name to coordinates
    #[tool(description = "Look up the latitude and longitude of a place by name (e.g., 'Nairobi', 'Fresno, CA').")]
    async fn geocode_location(
        &self,
        Parameters(request): Parameters<GeocodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Geocoding request for: {}", request.location);

        let location = self
            .client
            .geocode(&request.location)
            .await
            .map_err(|e| client_error("Failed to geocode location", e))?;

        Ok(CallToolResult::success(vec![Content::text(format_location(&location))]))
    }

    /// Summarises daily climate records for a place
    #[tool(description = "Get a summary of daily climate records (temperature, precipitation, humidity, wind, solar radiation) for a place. Dates are YYYYMMDD; defaults to the last 30 days.")]
    async fn get_climate_data(
        &self,
        Parameters(request): Parameters<ClimateDataRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting climate data for: {}", request.location);

        let (location, series) = self
            .fetch_series(
                &request.location,
                request.start_date.as_deref(),
                request.end_date.as_deref(),
            )
            .await?;

        let formatted = format_climate_summary(&location, &series);

        Ok(CallToolResult::success(vec![Content::text(formatted)]))
    }

    /// Classifies current conditions and issues crop care guidance
    #[tool(description = "Get crop care recommendations for a place. Trains a classifier on recent daily climate records, predicts whether the latest conditions are favorable and, if not, gives guidance per climate variable. Optionally pass the grower's name and a YYYYMMDD date window.")]
    async fn get_crop_recommendations(
        &self,
        Parameters(request): Parameters<RecommendationRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting crop recommendations for: {}", request.location);

        let (_, series) = self
            .fetch_series(
                &request.location,
                request.start_date.as_deref(),
                request.end_date.as_deref(),
            )
            .await?;

        let result = advise_in_background(series).await?;
        let formatted = format_recommendations(request.name.as_deref(), &request.location, &result);

        Ok(CallToolResult::success(vec![Content::text(formatted)]))
    }

    /// Runs the same pipeline on records supplied by the caller
    #[tool(description = "Get crop care recommendations from your own daily climate records instead of fetching them. Each record has a YYYYMMDD date and a map of variable codes (T2M, T2M_MAX, T2M_MIN, PRECTOTCORR, RH2M, WS2M, ALLSKY_SFC_SW_DWN, PS, QV10M, U10M, V10M) to values. Dates must be strictly increasing.")]
    async fn recommend_from_records(
        &self,
        Parameters(request): Parameters<RecordsRecommendationRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting crop recommendations for {} supplied records", request.records.len());

        let series = series_from_records(request.records)
            .map_err(|e| client_error("Invalid records", e))?;

        let result = advise_in_background(series).await?;
        let label = request.label.as_deref().unwrap_or("the supplied records");
        let formatted = format_recommendations(request.name.as_deref(), label, &result);

        Ok(CallToolResult::success(vec![Content::text(formatted)]))
    }
}

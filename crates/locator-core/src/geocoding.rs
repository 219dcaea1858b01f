//! Reverse geocoding — coordinates to a formatted street address.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::LocateError;
use crate::types::Coordinate;

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn address_for(&self, coord: Coordinate) -> Result<String, LocateError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: Option<String>,
}

/// First result's `formatted_address`. No result, or a blank one, is a failure.
fn first_address(resp: GeocodeResponse) -> Result<String, LocateError> {
    if resp.results.is_empty() {
        if let Some(status) = resp.status.as_deref() {
            debug!(
                status,
                error_message = resp.error_message.as_deref().unwrap_or(""),
                "Geocoding returned no results"
            );
        }
    }
    resp.results
        .into_iter()
        .next()
        .and_then(|r| r.formatted_address)
        .filter(|a| !a.trim().is_empty())
        .ok_or(LocateError::GeocodingNoResult)
}

/// Google-style geocoding endpoint: `GET base_url?latlng=<lat>,<lng>&key=<key>`.
pub struct HttpGeocoder {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpGeocoder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, LocateError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LocateError> {
        Self::new(
            config.geocoding.base_url.clone(),
            config.api_key(),
            &config.user_agent,
            config.geocoding.client_timeout(),
        )
    }
}

#[async_trait]
impl ReverseGeocoder for HttpGeocoder {
    async fn address_for(&self, coord: Coordinate) -> Result<String, LocateError> {
        debug!(latlng = %coord, "Reverse geocoding");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", coord.to_string()), ("key", self.api_key.clone())])
            .send()
            .await?
            .error_for_status()?;

        let body: GeocodeResponse = resp.json().await?;
        first_address(body)
    }
}

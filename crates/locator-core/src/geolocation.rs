//! Geolocation sources — where the device position comes from.
//!
//! The resolver never reaches for a platform capability directly; it is handed
//! a [`GeolocationSource`] at construction time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, GeolocationKind};
use crate::error::{redacted, LocateError};
use crate::types::Coordinate;

#[async_trait]
pub trait GeolocationSource: Send + Sync {
    /// Current position, or `GeolocationUnavailable` / `GeolocationDenied`.
    async fn current_coordinate(&self) -> Result<Coordinate, LocateError>;
}

/// A coordinate pinned in config.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

#[async_trait]
impl GeolocationSource for FixedLocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocateError> {
        Ok(self.0)
    }
}

/// Host without a geolocation capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl GeolocationSource for NoGeolocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocateError> {
        Err(LocateError::GeolocationUnavailable(
            "geolocation not supported".into(),
        ))
    }
}

/// Access refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedGeolocation;

#[async_trait]
impl GeolocationSource for DeniedGeolocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocateError> {
        Err(LocateError::GeolocationDenied)
    }
}

// ── IP-based geolocation ──

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// ipapi.co sets this with `reason` when it refuses to answer
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Approximate position of the host's public IP.
pub struct IpGeolocation {
    url: String,
    client: reqwest::Client,
}

impl IpGeolocation {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self, LocateError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| LocateError::GeolocationUnavailable(redacted(e)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl GeolocationSource for IpGeolocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocateError> {
        debug!(url = %self.url, "IP geolocation lookup");

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocateError::GeolocationUnavailable(redacted(e)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LocateError::GeolocationDenied);
        }
        if !status.is_success() {
            return Err(LocateError::GeolocationUnavailable(format!(
                "IP lookup returned status {}",
                status
            )));
        }

        let r: IpApiResult = resp
            .json()
            .await
            .map_err(|e| LocateError::GeolocationUnavailable(redacted(e)))?;

        if r.error {
            return Err(LocateError::GeolocationUnavailable(
                r.reason.unwrap_or_else(|| "IP lookup refused".into()),
            ));
        }

        match (r.latitude, r.longitude) {
            (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
            _ => Err(LocateError::GeolocationUnavailable(
                "no coordinates in IP lookup response".into(),
            )),
        }
    }
}

/// Build the configured source.
pub fn from_config(config: &Config) -> Result<Arc<dyn GeolocationSource>, LocateError> {
    let geo = &config.geolocation;
    let source: Arc<dyn GeolocationSource> = match geo.source {
        GeolocationKind::Fixed => match (geo.latitude, geo.longitude) {
            (Some(lat), Some(lng)) => Arc::new(FixedLocation(Coordinate::new(lat, lng))),
            _ => Arc::new(NoGeolocation),
        },
        GeolocationKind::Ip => Arc::new(IpGeolocation::new(
            geo.url.clone(),
            &config.user_agent,
            geo.client_timeout(),
        )?),
        GeolocationKind::None => Arc::new(NoGeolocation),
        GeolocationKind::Denied => Arc::new(DeniedGeolocation),
    };
    Ok(source)
}

//! Locate failures. None of these reach the host: the resolver turns every
//! one of them into an error-template reply.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("geolocation unavailable: {0}")]
    GeolocationUnavailable(String),

    #[error("geolocation access denied")]
    GeolocationDenied,

    #[error("geolocation timed out")]
    GeolocationTimeout,

    #[error("geocoding request failed: {0}")]
    GeocodingTransport(String),

    #[error("geocoding API returned status {0}")]
    GeocodingStatus(u16),

    #[error("no address found for the given coordinates")]
    GeocodingNoResult,

    #[error("geocoding timed out")]
    GeocodingTimeout,
}

impl LocateError {
    /// Stable snake_case tag for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GeolocationUnavailable(_) => "geolocation_unavailable",
            Self::GeolocationDenied => "geolocation_denied",
            Self::GeolocationTimeout => "geolocation_timeout",
            Self::GeocodingTransport(_) => "geocoding_transport",
            Self::GeocodingStatus(_) => "geocoding_status",
            Self::GeocodingNoResult => "geocoding_no_result",
            Self::GeocodingTimeout => "geocoding_timeout",
        }
    }

    /// Which step of the lookup failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::GeolocationUnavailable(_) | Self::GeolocationDenied | Self::GeolocationTimeout => {
                Stage::Geolocation
            }
            _ => Stage::Geocoding,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Geolocation,
    Geocoding,
}

/// reqwest's message without the request URL, which carries the API key.
pub(crate) fn redacted(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

impl From<reqwest::Error> for LocateError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::GeocodingStatus(status.as_u16()),
            None => Self::GeocodingTransport(redacted(e)),
        }
    }
}

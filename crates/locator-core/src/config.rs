//! Configuration — YAML config + env var overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_IP_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

/// HTTP clients wait this much longer than the resolver's deadline, so an
/// expired call always surfaces as a timeout rather than a transport error.
pub const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// Where the device position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeolocationKind {
    /// Static coordinate from config
    Fixed,
    /// IP-based lookup over HTTP
    Ip,
    /// Host has no geolocation capability
    None,
    /// Access refused by the operator
    Denied,
}

impl std::str::FromStr for GeolocationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "ip" => Ok(Self::Ip),
            "none" => Ok(Self::None),
            "denied" => Ok(Self::Denied),
            other => anyhow::bail!("Unknown geolocation source '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// API key (set here or via GEOCODING_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_geocoding_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_geolocation_kind")]
    pub source: GeolocationKind,

    /// Endpoint for the `ip` source
    #[serde(default = "default_ip_url")]
    pub url: String,

    /// Required for the `fixed` source
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub geolocation: GeolocationConfig,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Host settings handed to template interpolation
    #[serde(default)]
    pub settings: serde_json::Value,
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.into()
}
fn default_ip_url() -> String {
    DEFAULT_IP_GEOLOCATION_URL.into()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_geolocation_kind() -> GeolocationKind {
    GeolocationKind::Ip
}
fn default_user_agent() -> String {
    format!("gps-locator/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Load config from a YAML file with env var overrides.
    pub fn load(config_path: &Path) -> Result<Self> {
        Self::load_with(config_path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading overrides through `lookup` instead of the process env.
    pub fn load_with<F>(config_path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
        Self::from_yaml_with(&content, lookup)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::from_yaml_with(content, |name| std::env::var(name).ok())
    }

    pub fn from_yaml_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::read_yaml(content)?;
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// YAML only, no env overrides.
    pub fn parse(content: &str) -> Result<Self> {
        let config = Self::read_yaml(content)?;
        config.validate()?;
        Ok(config)
    }

    fn read_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config.yaml")
    }

    /// GEOCODING_API_KEY, GEOCODING_BASE_URL, LOCATOR_GEOLOCATION_SOURCE
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GEOCODING_API_KEY") {
            self.geocoding.api_key = Some(key);
        }
        if let Some(url) = lookup("GEOCODING_BASE_URL") {
            self.geocoding.base_url = url;
        }
        if let Some(src) = lookup("LOCATOR_GEOLOCATION_SOURCE") {
            self.geolocation.source = src.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.geolocation.source == GeolocationKind::Fixed {
            let (lat, lng) = match (self.geolocation.latitude, self.geolocation.longitude) {
                (Some(lat), Some(lng)) => (lat, lng),
                _ => anyhow::bail!("Geolocation source 'fixed' requires latitude and longitude"),
            };
            if !crate::types::Coordinate::new(lat, lng).is_valid() {
                anyhow::bail!("Fixed coordinate {},{} is out of range", lat, lng);
            }
        }
        if self.geocoding.timeout_ms == 0 || self.geolocation.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        Ok(())
    }

    /// API key, empty when unset. The provider rejects the call in that case
    /// and the resolver answers with an error template.
    pub fn api_key(&self) -> &str {
        self.geocoding.api_key.as_deref().unwrap_or("")
    }
}

impl GeocodingConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        self.deadline() + CLIENT_TIMEOUT_MARGIN
    }
}

impl GeolocationConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        self.deadline() + CLIENT_TIMEOUT_MARGIN
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            source: default_geolocation_kind(),
            url: default_ip_url(),
            latitude: None,
            longitude: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding: GeocodingConfig::default(),
            geolocation: GeolocationConfig::default(),
            user_agent: default_user_agent(),
            settings: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_config_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "geocoding:\n  api_key: abc").unwrap();

        let config = Config::load_with(tmp.path(), no_env).unwrap();
        assert_eq!(config.api_key(), "abc");
        assert_eq!(config.geocoding.base_url, DEFAULT_GEOCODING_URL);
        assert_eq!(config.geocoding.timeout_ms, 5000);
        assert_eq!(config.geolocation.source, GeolocationKind::Ip);
        assert_eq!(config.geolocation.timeout_ms, 5000);
        assert!(config.user_agent.starts_with("gps-locator/"));
    }

    #[test]
    fn test_load_config_fixed_source() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "geolocation:\n  source: fixed\n  latitude: 37.42\n  longitude: -122.08\n  timeout_ms: 250\nsettings:\n  contact:\n    company_name: Acme"
        )
        .unwrap();

        let config = Config::load_with(tmp.path(), no_env).unwrap();
        assert_eq!(config.geolocation.source, GeolocationKind::Fixed);
        assert_eq!(config.geolocation.latitude, Some(37.42));
        assert_eq!(config.geolocation.timeout_ms, 250);
        assert_eq!(config.settings["contact"]["company_name"], "Acme");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GEOCODING_API_KEY", "from-env"),
            ("GEOCODING_BASE_URL", "http://localhost:9999/geocode"),
            ("LOCATOR_GEOLOCATION_SOURCE", "denied"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_yaml_with(
            "geocoding:\n  api_key: from-file\ngeolocation:\n  source: ip",
            |name| env.get(name).map(|v| v.to_string()),
        )
        .unwrap();
        assert_eq!(config.api_key(), "from-env");
        assert_eq!(config.geocoding.base_url, "http://localhost:9999/geocode");
        assert_eq!(config.geolocation.source, GeolocationKind::Denied);
    }

    #[test]
    fn test_env_override_replaces_invalid_file_source() {
        let config = Config::from_yaml_with("geolocation:\n  source: fixed", |name| {
            (name == "LOCATOR_GEOLOCATION_SOURCE").then(|| "none".to_string())
        })
        .unwrap();
        assert_eq!(config.geolocation.source, GeolocationKind::None);
    }

    #[test]
    fn test_env_override_is_validated() {
        // Switching to `fixed` from the env still needs coordinates in the file
        let result = Config::from_yaml_with("{}", |name| {
            (name == "LOCATOR_GEOLOCATION_SOURCE").then(|| "fixed".to_string())
        });
        assert!(result.is_err());

        let result = Config::from_yaml_with("{}", |name| {
            (name == "LOCATOR_GEOLOCATION_SOURCE").then(|| "gps".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_fixed_without_coordinates_fails() {
        assert!(Config::parse("geolocation:\n  source: fixed").is_err());
    }

    #[test]
    fn test_fixed_out_of_range_fails() {
        let yaml = "geolocation:\n  source: fixed\n  latitude: 120\n  longitude: 0";
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_zero_timeout_fails() {
        assert!(Config::parse("geocoding:\n  timeout_ms: 0").is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(Config::load_with(Path::new("/nonexistent/config.yaml"), no_env).is_err());
    }

    #[test]
    fn test_client_timeout_outlasts_deadline() {
        let config = Config::parse("geocoding:\n  timeout_ms: 300\ngeolocation:\n  timeout_ms: 200").unwrap();
        assert_eq!(config.geocoding.deadline(), Duration::from_millis(300));
        assert!(config.geocoding.client_timeout() > config.geocoding.deadline());
        assert!(config.geolocation.client_timeout() > config.geolocation.deadline());
    }

    #[test]
    fn test_geolocation_kind_parse() {
        assert_eq!("IP".parse::<GeolocationKind>().unwrap(), GeolocationKind::Ip);
        assert_eq!(" denied ".parse::<GeolocationKind>().unwrap(), GeolocationKind::Denied);
        assert!("gps".parse::<GeolocationKind>().is_err());
    }
}

//! LocationReplyResolver — position, address, reply. Always answers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::LocateError;
use crate::events::{FailedData, LocateEvent, ResolvedData};
use crate::geocoding::{HttpGeocoder, ReverseGeocoder};
use crate::geolocation::{self, GeolocationSource};
use crate::template::{PlaceholderProcessor, RandomPicker, TemplatePicker, TextProcessor};
use crate::types::{Context, Coordinate, OutgoingTextEnvelope, ReplyTemplateSet, Settings};

/// Used when a block has no response templates left to pick from.
pub const DEFAULT_RESPONSE_TEXT: &str = "Here is your current location.";
/// Used when a block has no error templates left to pick from.
pub const DEFAULT_ERROR_TEXT: &str = "Sorry, I couldn't determine your location right now.";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const ADDRESS_PREFIX: &str = " 🏠 Address: ";

pub struct LocationReplyResolver {
    geolocation: Arc<dyn GeolocationSource>,
    geocoder: Arc<dyn ReverseGeocoder>,
    picker: Arc<dyn TemplatePicker>,
    processor: Arc<dyn TextProcessor>,
    geolocation_timeout: Duration,
    geocoding_timeout: Duration,
    event_tx: broadcast::Sender<LocateEvent>,
}

impl LocationReplyResolver {
    pub fn new(
        geolocation: Arc<dyn GeolocationSource>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            geolocation,
            geocoder,
            picker: Arc::new(RandomPicker),
            processor: Arc::new(PlaceholderProcessor),
            geolocation_timeout: DEFAULT_TIMEOUT,
            geocoding_timeout: DEFAULT_TIMEOUT,
            event_tx,
        }
    }

    /// Wire the configured geolocation source and HTTP geocoder.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let geolocation = geolocation::from_config(config)?;
        let geocoder = HttpGeocoder::from_config(config)?;
        Ok(Self::new(geolocation, Arc::new(geocoder))
            .with_timeouts(config.geolocation.deadline(), config.geocoding.deadline()))
    }

    pub fn with_picker(mut self, picker: Arc<dyn TemplatePicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn TextProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_timeouts(mut self, geolocation: Duration, geocoding: Duration) -> Self {
        self.geolocation_timeout = geolocation;
        self.geocoding_timeout = geocoding;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LocateEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: LocateEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Build the reply for one invocation. Failures never escape: they pick
    /// from `error_message` instead of `response_message`.
    pub async fn resolve(
        &self,
        templates: &ReplyTemplateSet,
        context: &Context,
        settings: &Settings,
    ) -> OutgoingTextEnvelope {
        let invocation_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        match self.locate().await {
            Ok((coord, address)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                info!(%invocation_id, latlng = %coord, elapsed_ms, "Location resolved");
                self.broadcast(LocateEvent::Resolved(ResolvedData {
                    invocation_id,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    latitude: coord.latitude,
                    longitude: coord.longitude,
                    address: address.clone(),
                    elapsed_ms,
                }));

                let mut vars = HashMap::new();
                vars.insert("address".to_string(), address.clone());
                vars.insert("latitude".to_string(), coord.latitude.to_string());
                vars.insert("longitude".to_string(), coord.longitude.to_string());

                let text = self.render(
                    &templates.response_message,
                    DEFAULT_RESPONSE_TEXT,
                    context,
                    &vars,
                    settings,
                );
                OutgoingTextEnvelope::text(format!("{}{}{}", text, ADDRESS_PREFIX, address))
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    %invocation_id,
                    stage = ?err.stage(),
                    kind = err.kind(),
                    error = %err,
                    elapsed_ms,
                    "Location lookup failed, replying with error template"
                );
                self.broadcast(LocateEvent::Failed(FailedData::from_error(
                    &invocation_id,
                    &err,
                    elapsed_ms,
                )));

                let text = self.render(
                    &templates.error_message,
                    DEFAULT_ERROR_TEXT,
                    context,
                    &HashMap::new(),
                    settings,
                );
                OutgoingTextEnvelope::text(text)
            }
        }
    }

    /// Geolocation then geocoding, each under its own deadline.
    async fn locate(&self) -> Result<(Coordinate, String), LocateError> {
        let coord = tokio::time::timeout(
            self.geolocation_timeout,
            self.geolocation.current_coordinate(),
        )
        .await
        .map_err(|_| LocateError::GeolocationTimeout)??;

        if !coord.is_valid() {
            return Err(LocateError::GeolocationUnavailable(format!(
                "coordinate out of range: {}",
                coord
            )));
        }

        let address = tokio::time::timeout(self.geocoding_timeout, self.geocoder.address_for(coord))
            .await
            .map_err(|_| LocateError::GeocodingTimeout)??;

        Ok((coord, address))
    }

    fn render(
        &self,
        templates: &[String],
        fallback: &str,
        context: &Context,
        vars: &HashMap<String, String>,
        settings: &Settings,
    ) -> String {
        let template = self.picker.pick(templates).unwrap_or(fallback);
        let text = self.processor.process(template, context, vars, settings);
        if text.trim().is_empty() {
            fallback.to_string()
        } else {
            text
        }
    }
}

//! Web server — Axum router + shared state.

pub mod api;

use std::collections::VecDeque;
use std::sync::Arc;

use axum::Router;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::CorsLayer;
use tracing::info;

use locator_core::events::LocateEvent;
use locator_core::GpsPlugin;

/// How many locate events `/api/diagnostics` keeps.
pub const DIAGNOSTICS_CAPACITY: usize = 200;

/// Shared application state — the plugin and its recent diagnostics.
pub struct AppState {
    pub plugin: GpsPlugin,
    pub diagnostics: RwLock<VecDeque<LocateEvent>>,
}

impl AppState {
    pub fn new(plugin: GpsPlugin) -> Self {
        Self {
            plugin,
            diagnostics: RwLock::new(VecDeque::with_capacity(DIAGNOSTICS_CAPACITY)),
        }
    }

    pub async fn record(&self, event: LocateEvent) {
        let mut ring = self.diagnostics.write().await;
        if ring.len() == DIAGNOSTICS_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(event);
    }
}

/// Copy every resolver event into the diagnostics ring until the resolver goes away.
pub fn spawn_diagnostics_recorder(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let mut rx = state.plugin.resolver().subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => state.record(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    info!("Diagnostics recorder lagged {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::very_permissive();

    Router::new()
        .merge(api::routes())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use locator_core::events::{FailedData, LocateEvent};
    use locator_core::geocoding::HttpGeocoder;
    use locator_core::geolocation::NoGeolocation;
    use locator_core::types::Settings;
    use locator_core::{LocateError, LocationReplyResolver};
    use std::time::Duration;

    #[tokio::test]
    async fn test_diagnostics_ring_is_bounded() {
        let geocoder =
            HttpGeocoder::new("http://127.0.0.1:9/", "", "test", Duration::from_secs(1)).unwrap();
        let resolver = LocationReplyResolver::new(Arc::new(NoGeolocation), Arc::new(geocoder));
        let state = AppState::new(GpsPlugin::new(resolver, Settings::default()));

        for i in 0..(DIAGNOSTICS_CAPACITY + 5) {
            let data = FailedData::from_error(&i.to_string(), &LocateError::GeocodingNoResult, 0);
            state.record(LocateEvent::Failed(data)).await;
        }

        let ring = state.diagnostics.read().await;
        assert_eq!(ring.len(), DIAGNOSTICS_CAPACITY);
        assert_eq!(ring.front().unwrap().invocation_id(), "5");
    }
}

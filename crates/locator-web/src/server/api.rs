//! REST API endpoints — the host side of the plugin contract.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use locator_core::types::{Block, Context, OutgoingTextEnvelope, PluginMessage};

use super::AppState;

const ANONYMOUS_CONVERSATION: &str = "anonymous";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/plugin", get(get_plugin))
        .route("/api/process", post(post_process))
        .route("/api/message", post(post_message))
        .route("/api/diagnostics", get(get_diagnostics))
}

// --- Health ---

async fn get_health() -> Json<Value> {
    Json(json!({"ok": true}))
}

// --- Plugin descriptor ---

async fn get_plugin(State(state): State<Arc<AppState>>) -> Json<Value> {
    let plugin = &state.plugin;
    Json(json!({
        "id": plugin.id(),
        "template": plugin.template(),
        "settings": plugin.settings(),
    }))
}

// --- Process a block ---

#[derive(Deserialize)]
struct ProcessBody {
    #[serde(default)]
    block: Block,
    #[serde(default)]
    context: Context,
    conversation_id: Option<String>,
}

async fn post_process(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProcessBody>,
) -> Json<OutgoingTextEnvelope> {
    let conversation_id = body
        .conversation_id
        .as_deref()
        .unwrap_or(ANONYMOUS_CONVERSATION);
    let envelope = state
        .plugin
        .process(&body.block, &body.context, conversation_id)
        .await;
    Json(envelope)
}

// --- Incoming message, matched against the plugin patterns ---

#[derive(Deserialize)]
struct MessageBody {
    text: Option<String>,
    #[serde(default)]
    context: Context,
    conversation_id: Option<String>,
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageBody>,
) -> Json<Value> {
    let text = body.text.as_deref().unwrap_or("");
    if !state.plugin.matches(text) {
        return Json(json!({"matched": false}));
    }

    // A bare trigger runs the plugin with its default templates
    let block = Block {
        message: PluginMessage {
            plugin: state.plugin.id().to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let conversation_id = body
        .conversation_id
        .as_deref()
        .unwrap_or(ANONYMOUS_CONVERSATION);
    let envelope = state
        .plugin
        .process(&block, &body.context, conversation_id)
        .await;
    Json(json!({"matched": true, "envelope": envelope}))
}

// --- Diagnostics ---

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn get_diagnostics(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> Json<Value> {
    let limit = q.limit.unwrap_or(50);
    let ring = state.diagnostics.read().await;
    let start = ring.len().saturating_sub(limit);
    let recent: Vec<_> = ring.iter().skip(start).collect();
    Json(json!(recent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{router, spawn_diagnostics_recorder};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use locator_core::geocoding::ReverseGeocoder;
    use locator_core::geolocation::{DeniedGeolocation, FixedLocation, GeolocationSource};
    use locator_core::resolver::DEFAULT_ERROR_TEXT;
    use locator_core::types::{Coordinate, Settings};
    use locator_core::{GpsPlugin, LocateError, LocationReplyResolver};
    use tower::ServiceExt;

    struct StaticGeocoder;

    #[async_trait]
    impl ReverseGeocoder for StaticGeocoder {
        async fn address_for(&self, _coord: Coordinate) -> Result<String, LocateError> {
            Ok("1600 Amphitheatre Pkwy, Mountain View, CA".to_string())
        }
    }

    fn state_with(geo: Arc<dyn GeolocationSource>) -> Arc<AppState> {
        let resolver = LocationReplyResolver::new(geo, Arc::new(StaticGeocoder));
        Arc::new(AppState::new(GpsPlugin::new(resolver, Settings::default())))
    }

    fn here() -> Arc<dyn GeolocationSource> {
        Arc::new(FixedLocation(Coordinate::new(37.42, -122.08)))
    }

    async fn call(state: Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_plugin_descriptor() {
        let (status, v) = call(
            state_with(here()),
            Request::get("/api/plugin").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["id"], "gps-plugin");
        assert_eq!(v["template"]["patterns"], json!(["gps"]));
        assert_eq!(v["template"]["starts_conversation"], true);
        assert_eq!(v["settings"][0]["label"], "response_message");
        assert_eq!(v["settings"][0]["type"], "multiple_text");
    }

    #[tokio::test]
    async fn test_process_success() {
        let (status, v) = call(
            state_with(here()),
            post_json(
                "/api/process",
                json!({
                    "block": {"message": {"plugin": "gps-plugin", "args": {
                        "response_message": ["Here you go!"],
                        "error_message": ["Couldn't find you 😢"]
                    }}},
                    "context": {},
                    "conversation_id": "c1"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            v,
            json!({
                "format": "text",
                "message": {"text": "Here you go! 🏠 Address: 1600 Amphitheatre Pkwy, Mountain View, CA"}
            })
        );
    }

    #[tokio::test]
    async fn test_process_failure_still_replies() {
        let (status, v) = call(
            state_with(Arc::new(DeniedGeolocation)),
            post_json("/api/process", json!({"block": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["format"], "text");
        assert_eq!(v["message"]["text"], DEFAULT_ERROR_TEXT);
    }

    #[tokio::test]
    async fn test_message_pattern_matching() {
        let state = state_with(here());
        let (_, v) = call(state.clone(), post_json("/api/message", json!({"text": "hello"}))).await;
        assert_eq!(v, json!({"matched": false}));

        let (_, v) = call(state, post_json("/api/message", json!({"text": "GPS"}))).await;
        assert_eq!(v["matched"], true);
        assert_eq!(v["envelope"]["format"], "text");
        assert!(v["envelope"]["message"]["text"]
            .as_str()
            .unwrap()
            .ends_with("🏠 Address: 1600 Amphitheatre Pkwy, Mountain View, CA"));
    }

    #[tokio::test]
    async fn test_diagnostics_records_failures() {
        let state = state_with(Arc::new(DeniedGeolocation));
        let recorder = spawn_diagnostics_recorder(state.clone());

        call(state.clone(), post_json("/api/process", json!({"block": {}}))).await;

        // Let the recorder drain the channel
        for _ in 0..50 {
            if !state.diagnostics.read().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let (_, v) = call(
            state.clone(),
            Request::get("/api/diagnostics?limit=5").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(v.as_array().unwrap().len(), 1);
        assert_eq!(v[0]["event"], "failed");
        assert_eq!(v[0]["data"]["kind"], "geolocation_denied");
        recorder.abort();
    }

    #[tokio::test]
    async fn test_health() {
        let (status, v) = call(
            state_with(here()),
            Request::get("/api/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_no_event_stream_route() {
        let resp = router(state_with(here()))
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

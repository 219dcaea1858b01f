//! LocateEvent enum — broadcast from the resolver to diagnostics subscribers via tokio::broadcast.

use serde::{Deserialize, Serialize};

use crate::error::{LocateError, Stage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedData {
    pub invocation_id: String,
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedData {
    pub invocation_id: String,
    pub timestamp: String,
    pub stage: Stage,
    pub kind: String,
    pub detail: String,
    pub elapsed_ms: u64,
}

impl FailedData {
    pub fn from_error(invocation_id: &str, err: &LocateError, elapsed_ms: u64) -> Self {
        Self {
            invocation_id: invocation_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            stage: err.stage(),
            kind: err.kind().to_string(),
            detail: err.to_string(),
            elapsed_ms,
        }
    }
}

/// One event per invocation, emitted whichever branch ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum LocateEvent {
    #[serde(rename = "resolved")]
    Resolved(ResolvedData),

    /// The user got an error template; this carries the reason.
    #[serde(rename = "failed")]
    Failed(FailedData),
}

impl LocateEvent {
    pub fn invocation_id(&self) -> &str {
        match self {
            LocateEvent::Resolved(d) => &d.invocation_id,
            LocateEvent::Failed(d) => &d.invocation_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LocateEvent::Failed(_))
    }
}

//! Core types — Coordinate, ReplyTemplateSet, envelopes, and the host's block/context shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Coordinates ──

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in [-90, 90] and longitude in [-180, 180], both finite.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

// ── Reply templates ──

/// Per-block reply templates: one of each list is picked per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTemplateSet {
    #[serde(default)]
    pub response_message: Vec<String>,
    #[serde(default)]
    pub error_message: Vec<String>,
}

// ── Outgoing envelope ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutgoingMessageFormat {
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub text: String,
}

/// `{"format": "text", "message": {"text": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingTextEnvelope {
    pub format: OutgoingMessageFormat,
    pub message: TextMessage,
}

impl OutgoingTextEnvelope {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            format: OutgoingMessageFormat::Text,
            message: TextMessage { text: text.into() },
        }
    }

    pub fn as_text(&self) -> &str {
        &self.message.text
    }
}

// ── Host-supplied inputs ──

/// The plugin part of a block: which plugin runs and its per-block arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginMessage {
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: PluginMessage,
}

/// Per-conversation state, read-only for the plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(pub Value);

/// Host settings, read-only for the plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(pub Value);

impl Context {
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.0, path)
    }
}

impl Settings {
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.0, path)
    }
}

/// Walk a dotted path (`user.first_name`) through nested objects.
/// Numeric segments index into arrays. An empty path or an empty segment
/// (`a..b`, trailing dot) resolves to nothing.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, seg| {
        if seg.is_empty() {
            return None;
        }
        match node {
            Value::Object(map) => map.get(seg),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

// ── Plugin descriptor ──

/// How the host matches and labels the plugin's block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginTemplate {
    pub patterns: Vec<String>,
    pub starts_conversation: bool,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    MultipleText,
}

/// A block-level setting the host renders in its editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingDefinition {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: SettingKind,
    pub default: Vec<String>,
}

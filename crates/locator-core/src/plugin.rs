//! GpsPlugin — what the host registers: id, block template, settings, and `process`.

use serde_json::Value;
use tracing::info;

use crate::resolver::{LocationReplyResolver, DEFAULT_ERROR_TEXT, DEFAULT_RESPONSE_TEXT};
use crate::types::{
    Block, Context, OutgoingTextEnvelope, PluginTemplate, ReplyTemplateSet, SettingDefinition,
    SettingKind, Settings,
};

pub const PLUGIN_ID: &str = "gps-plugin";
pub const PLUGIN_NAME: &str = "GPS Locator Plugin";
pub const PATTERNS: &[&str] = &["gps"];

pub const RESPONSE_MESSAGE: &str = "response_message";
pub const ERROR_MESSAGE: &str = "error_message";

pub struct GpsPlugin {
    resolver: LocationReplyResolver,
    settings: Settings,
}

impl GpsPlugin {
    pub fn new(resolver: LocationReplyResolver, settings: Settings) -> Self {
        Self { resolver, settings }
    }

    pub fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    pub fn resolver(&self) -> &LocationReplyResolver {
        &self.resolver
    }

    pub fn template(&self) -> PluginTemplate {
        PluginTemplate {
            patterns: PATTERNS.iter().map(|p| p.to_string()).collect(),
            starts_conversation: true,
            name: PLUGIN_NAME.to_string(),
        }
    }

    pub fn settings(&self) -> Vec<SettingDefinition> {
        vec![
            SettingDefinition {
                label: RESPONSE_MESSAGE.to_string(),
                kind: SettingKind::MultipleText,
                default: vec![DEFAULT_RESPONSE_TEXT.to_string()],
            },
            SettingDefinition {
                label: ERROR_MESSAGE.to_string(),
                kind: SettingKind::MultipleText,
                default: vec![DEFAULT_ERROR_TEXT.to_string()],
            },
        ]
    }

    /// Does an incoming message trigger this plugin? Literal, case-insensitive.
    pub fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        PATTERNS.iter().any(|p| p.eq_ignore_ascii_case(text))
    }

    /// Block args over setting defaults.
    pub fn arguments(&self, block: &Block) -> ReplyTemplateSet {
        let mut set = ReplyTemplateSet::default();
        for def in self.settings() {
            let values = block
                .message
                .args
                .get(&def.label)
                .and_then(string_list)
                .unwrap_or(def.default);
            match def.label.as_str() {
                RESPONSE_MESSAGE => set.response_message = values,
                ERROR_MESSAGE => set.error_message = values,
                _ => {}
            }
        }
        set
    }

    pub async fn process(
        &self,
        block: &Block,
        context: &Context,
        conversation_id: &str,
    ) -> OutgoingTextEnvelope {
        info!(
            conversation_id,
            block = block.name.as_deref().unwrap_or(""),
            "Processing GPS block"
        );
        let templates = self.arguments(block);
        self.resolver.resolve(&templates, context, &self.settings).await
    }
}

/// A string or an array of strings. Anything else is treated as unset.
fn string_list(v: &Value) -> Option<Vec<String>> {
    match v {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|i| i.as_str().map(String::from))
            .collect(),
        _ => None,
    }
}

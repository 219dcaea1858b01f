//! Template picking and placeholder interpolation.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex_lite::{Captures, Regex};
use serde_json::Value;

use crate::types::{lookup_path, Context, Settings};

// ── Picking ──

pub trait TemplatePicker: Send + Sync {
    /// One template out of `templates`, or `None` when the list is empty.
    fn pick<'a>(&self, templates: &'a [String]) -> Option<&'a str>;
}

/// Uniform pick with the thread RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl TemplatePicker for RandomPicker {
    fn pick<'a>(&self, templates: &'a [String]) -> Option<&'a str> {
        templates.choose(&mut rand::thread_rng()).map(String::as_str)
    }
}

/// Uniform pick from a seeded RNG, reproducible across runs.
pub struct SeededPicker {
    rng: Mutex<StdRng>,
}

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl TemplatePicker for SeededPicker {
    fn pick<'a>(&self, templates: &'a [String]) -> Option<&'a str> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        templates.choose(&mut *rng).map(String::as_str)
    }
}

/// Always the same index, wrapped around the list length.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl TemplatePicker for FixedPicker {
    fn pick<'a>(&self, templates: &'a [String]) -> Option<&'a str> {
        if templates.is_empty() {
            return None;
        }
        templates.get(self.0 % templates.len()).map(String::as_str)
    }
}

// ── Interpolation ──

pub trait TextProcessor: Send + Sync {
    fn process(
        &self,
        template: &str,
        context: &Context,
        extra_vars: &HashMap<String, String>,
        settings: &Settings,
    ) -> String;
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_][A-Za-z0-9_.\-]*)\}").unwrap())
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replaces `{context.<path>}`, `{settings.<path>}`, `{contact.<path>}` and
/// bare `{name}` extra vars. Anything it cannot resolve stays as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderProcessor;

impl PlaceholderProcessor {
    fn resolve(
        key: &str,
        context: &Context,
        extra_vars: &HashMap<String, String>,
        settings: &Settings,
    ) -> Option<String> {
        if let Some(path) = key.strip_prefix("context.") {
            return context.lookup(path).map(render_value);
        }
        if let Some(path) = key.strip_prefix("settings.") {
            return settings.lookup(path).map(render_value);
        }
        if let Some(path) = key.strip_prefix("contact.") {
            return settings
                .lookup("contact")
                .and_then(|contact| lookup_path(contact, path))
                .map(render_value);
        }
        extra_vars.get(key).cloned()
    }
}

impl TextProcessor for PlaceholderProcessor {
    fn process(
        &self,
        template: &str,
        context: &Context,
        extra_vars: &HashMap<String, String>,
        settings: &Settings,
    ) -> String {
        placeholder_re()
            .replace_all(template, |caps: &Captures| {
                let key = &caps[1];
                Self::resolve(key, context, extra_vars, settings)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

//! Per-field default resolution shared by every provider adapter.
//!
//! Priority, evaluated independently for each field:
//! 1. the descriptor's own value (per-call override)
//! 2. `defaults.<provider>.<field>` in config
//! 3. `defaults.<field>` in config
//! 4. the adapter's hardcoded literal

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use docenrich_shared::{EnrichConfig, SourceDescriptor};

/// Config sections consulted after a descriptor's own fields.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefaults<'a> {
    pub api_keys: &'a BTreeMap<String, String>,
    pub defaults: &'a Map<String, Value>,
}

impl<'a> From<&'a EnrichConfig> for ProviderDefaults<'a> {
    fn from(config: &'a EnrichConfig) -> Self {
        Self {
            api_keys: &config.api_keys,
            defaults: &config.defaults,
        }
    }
}

/// Resolves fields for one descriptor on behalf of one provider.
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver<'a> {
    provider: &'a str,
    source: &'a SourceDescriptor,
    config: ProviderDefaults<'a>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(provider: &'a str, source: &'a SourceDescriptor, config: ProviderDefaults<'a>) -> Self {
        Self {
            provider,
            source,
            config,
        }
    }

    /// First value found for `field`, without a literal fallback.
    pub fn lookup(&self, field: &str) -> Option<&'a Value> {
        if let Some(value) = self.source.overrides.get(field) {
            return Some(value);
        }
        if let Some(value) = self
            .config
            .defaults
            .get(self.provider)
            .and_then(Value::as_object)
            .and_then(|section| section.get(field))
        {
            return Some(value);
        }
        self.config.defaults.get(field)
    }

    /// Resolve `field`, falling back to `literal`.
    pub fn resolve(&self, field: &str, literal: Value) -> Value {
        self.lookup(field).cloned().unwrap_or(literal)
    }

    /// Resolve `field` as a string. Numbers and booleans are stringified;
    /// any other shape falls back to `literal`.
    pub fn resolve_str(&self, field: &str, literal: &str) -> String {
        match self.lookup(field) {
            Some(Value::String(s)) => s.clone(),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
            _ => literal.to_string(),
        }
    }

    /// API key: descriptor `api_key`, then `api_keys.<provider>_api_key`, then empty.
    pub fn api_key(&self) -> String {
        if let Some(key) = &self.source.api_key {
            return key.clone();
        }
        self.config
            .api_keys
            .get(&format!("{}_api_key", self.provider))
            .cloned()
            .unwrap_or_default()
    }
}

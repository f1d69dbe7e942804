//! Core domain types: document signals, source descriptors, and enriched records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnrichError, Result};

// ---------------------------------------------------------------------------
// Metadata / Context
// ---------------------------------------------------------------------------

/// Descriptive metadata for one document.
///
/// Only `keywords` is interpreted by the aggregation engine; every other
/// field (title, tags, sections, ...) rides along opaquely in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Ordered keywords; each one seeds an aggregate entry.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Remaining descriptive fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Metadata {
    /// Build metadata from untyped JSON, rejecting the wrong shape.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(EnrichError::input_shape("metadata must be a JSON object"));
        };
        ensure_string_list(&mut map, "keywords", "metadata")?;
        serde_json::from_value(Value::Object(map))
            .map_err(|e| EnrichError::input_shape(format!("metadata: {e}")))
    }

    /// Set an opaque descriptive field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }
}

/// Contextual signals for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Ordered named entities; each one seeds an aggregate entry.
    #[serde(default)]
    pub named_entities: Vec<String>,
    /// Remaining contextual fields (surrounding text, headers, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Context {
    /// Build a context from untyped JSON, rejecting the wrong shape.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(EnrichError::input_shape("context must be a JSON object"));
        };
        ensure_string_list(&mut map, "named_entities", "context")?;
        serde_json::from_value(Value::Object(map))
            .map_err(|e| EnrichError::input_shape(format!("context: {e}")))
    }

    /// Set an opaque contextual field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }
}

/// A missing or `null` list is treated as empty.
fn ensure_string_list(map: &mut Map<String, Value>, key: &str, owner: &str) -> Result<()> {
    match map.get(key) {
        None => Ok(()),
        Some(Value::Null) => {
            map.remove(key);
            Ok(())
        }
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(()),
        Some(_) => Err(EnrichError::input_shape(format!(
            "{owner}.{key} must be a list of strings"
        ))),
    }
}

// ---------------------------------------------------------------------------
// SourceDescriptor
// ---------------------------------------------------------------------------

/// One configured data-source call.
///
/// Fields the provider adapters understand beyond the fixed ones below
/// (`cx`, `query`, `model`, `inputs`, `notion_version`, ...) are per-call
/// overrides and land in `overrides`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Provider type (`generic`, `notion`, `google`, `openai`, `hugging_face`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Endpoint URL. Required unless the provider has a fixed endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Query parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// Extra request headers, applied after the provider's own.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Per-call API key, taking priority over `api_keys` in config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-call field overrides.
    #[serde(flatten)]
    pub overrides: Map<String, Value>,
}

impl SourceDescriptor {
    /// Create a descriptor of the given provider type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Set the endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a per-call override.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// URL for log fields; empty when none is configured.
    pub fn url_for_log(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// SourceGroup
// ---------------------------------------------------------------------------

/// Which configured source list an aggregation runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceGroup {
    External,
    Internal,
}

impl SourceGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for SourceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceGroup {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "external" => Ok(Self::External),
            "internal" => Ok(Self::Internal),
            other => Err(EnrichError::parse(format!("unknown source group: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// FetchResult
// ---------------------------------------------------------------------------

/// Key → value record returned by one source and merged into the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchResult(Map<String, Value>);

impl FetchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a decoded response body into a result.
    ///
    /// Objects are used as-is; any other JSON value is wrapped under
    /// `source_type` so it can still be merged.
    pub fn from_body(source_type: &str, body: Value) -> Self {
        match body {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert(source_type.to_string(), other);
                Self(map)
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Merge `other` into `self`; keys from `other` win on collision.
    pub fn merge(&mut self, other: FetchResult) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for FetchResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// EnrichedRecord
// ---------------------------------------------------------------------------

/// The per-document output: signals plus both aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub metadata: Metadata,
    pub context: Context,
    pub external_data: FetchResult,
    pub internal_data: FetchResult,
}

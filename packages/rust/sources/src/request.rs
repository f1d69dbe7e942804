//! The canonical outbound request every adapter shapes, and its cache fingerprint.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};
use url::{Url, form_urlencoded};

/// HTTP method of a source request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One fully shaped request: `request(url, method, headers, query-or-body)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRequest {
    /// Provider type that shaped this request (used in logs and body wrapping).
    pub source_type: String,
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl SourceRequest {
    /// A GET request with no headers or query.
    pub fn get(source_type: &str, url: Url) -> Self {
        Self::new(source_type, HttpMethod::Get, url)
    }

    /// A POST request with no headers or body.
    pub fn post(source_type: &str, url: Url) -> Self {
        Self::new(source_type, HttpMethod::Post, url)
    }

    fn new(source_type: &str, method: HttpMethod, url: Url) -> Self {
        Self {
            source_type: source_type.to_string(),
            method,
            url,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_bearer(self, token: &str) -> Self {
        if token.is_empty() {
            self
        } else {
            self.with_header("Authorization", format!("Bearer {token}"))
        }
    }

    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Deterministic cache key for this request.
    ///
    /// Built from the URL and the key-sorted, form-encoded query parameters;
    /// method and body are appended so POSTs to a shared endpoint stay
    /// distinct.
    /// Headers are not part of the key.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut canonical = format!("{} {}", self.method.as_str(), self.url);
        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            canonical.push('?');
            canonical.push_str(&query);
        }
        if let Some(body) = &self.body {
            canonical.push(' ');
            write_canonical_json(&mut canonical, body);
        }

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }
}

/// JSON with object keys sorted at every level.
fn write_canonical_json(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical_json(out, &map[key]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_json(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 hex digest identifying a request for caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

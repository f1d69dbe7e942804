//! Provider adapter trait and the registry mapping source types to adapters.
//!
//! Adapters are pure: they turn a [`SourceDescriptor`] into a
//! [`SourceRequest`] and never touch the network. The registry is built once
//! at startup and only read afterwards.

mod generic;
mod google;
mod hugging_face;
mod notion;
mod openai;

use std::collections::BTreeMap;

use url::Url;

use docenrich_shared::{EnrichError, Result, SourceDescriptor};

use crate::request::SourceRequest;
use crate::resolve::FieldResolver;

pub use generic::GenericAdapter;
pub use google::{GOOGLE_SEARCH_URL, GoogleAdapter};
pub use hugging_face::HuggingFaceAdapter;
pub use notion::{NOTION_VERSION, NotionAdapter};
pub use openai::{OPENAI_ANSWERS_URL, OpenAiAdapter};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Shapes one provider's request from a descriptor.
pub trait SourceAdapter: Send + Sync {
    /// Source type this adapter is registered under.
    fn name(&self) -> &'static str;

    /// Provider-specific shaping. A missing or invalid required field is a
    /// config error scoped to this one source.
    fn shape(&self, source: &SourceDescriptor, fields: &FieldResolver<'_>)
    -> Result<SourceRequest>;

    /// [`SourceAdapter::shape`] plus the descriptor's own headers, which
    /// override the provider's.
    fn build(
        &self,
        source: &SourceDescriptor,
        fields: &FieldResolver<'_>,
    ) -> Result<SourceRequest> {
        let mut request = self.shape(source, fields)?;
        request.headers.extend(source.headers.clone());
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only map from source type to adapter.
pub struct SourceRegistry {
    adapters: BTreeMap<&'static str, Box<dyn SourceAdapter>>,
}

impl SourceRegistry {
    /// A registry with every built-in provider.
    pub fn new() -> Self {
        Self::empty()
            .with(GenericAdapter)
            .with(NotionAdapter)
            .with(GoogleAdapter)
            .with(OpenAiAdapter)
            .with(HuggingFaceAdapter)
    }

    /// A registry with no providers.
    pub fn empty() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    /// Register an adapter, replacing any existing one with the same name.
    pub fn with(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.adapters.insert(adapter.name(), Box::new(adapter));
        self
    }

    /// Look up the adapter for a source type. `None` means "skip this source".
    pub fn resolve(&self, kind: &str) -> Option<&dyn SourceAdapter> {
        self.adapters.get(kind).map(|a| a.as_ref())
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.keys().copied()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// The descriptor's URL, which this provider cannot do without.
pub(crate) fn required_url(source: &SourceDescriptor, provider: &str) -> Result<Url> {
    match source.url.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_url(provider, raw),
        _ => Err(EnrichError::config(format!(
            "{provider} source requires a url"
        ))),
    }
}

/// The descriptor's URL if set, otherwise the provider's fixed endpoint.
pub(crate) fn url_or_default(
    source: &SourceDescriptor,
    provider: &str,
    endpoint: &str,
) -> Result<Url> {
    match source.url.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_url(provider, raw),
        _ => parse_url(provider, endpoint),
    }
}

fn parse_url(provider: &str, raw: &str) -> Result<Url> {
    Url::parse(raw)
        .map_err(|e| EnrichError::config(format!("{provider} source has invalid url {raw:?}: {e}")))
}


#[cfg(test)]
mod tests {
    use super::*;
    use docenrich_shared::EnrichConfig;

    #[test]
    fn registry_has_builtin_providers() {
        let registry = SourceRegistry::new();
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(
            kinds,
            vec!["generic", "google", "hugging_face", "notion", "openai"]
        );
        for kind in kinds {
            assert_eq!(registry.resolve(kind).map(|a| a.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_type_resolves_to_none() {
        let registry = SourceRegistry::new();
        assert!(registry.resolve("unregistered").is_none());
        assert!(registry.resolve("").is_none());
        assert!(registry.resolve("Generic").is_none());
    }

    #[test]
    fn custom_adapter_can_be_registered() {
        struct Echo;
        impl SourceAdapter for Echo {
            fn name(&self) -> &'static str {
                "echo"
            }
            fn shape(
                &self,
                source: &SourceDescriptor,
                _fields: &FieldResolver<'_>,
            ) -> Result<SourceRequest> {
                Ok(SourceRequest::get("echo", required_url(source, "echo")?))
            }
        }

        let registry = SourceRegistry::empty().with(Echo);
        assert!(registry.resolve("echo").is_some());
        assert!(registry.resolve("generic").is_none());
    }

    #[test]
    fn descriptor_headers_override_provider_headers() {
        let source = SourceDescriptor::new("notion")
            .with_url("https://api.notion.com/v1/pages/abc")
            .with_header("Notion-Version", "2099-01-01")
            .with_header("X-Trace", "1");
        let request = test_support::build(&source, &EnrichConfig::default()).expect("build");
        assert_eq!(request.headers["Notion-Version"], "2099-01-01");
        assert_eq!(request.headers["X-Trace"], "1");
    }

    #[test]
    fn missing_required_url_is_config_error() {
        let source = SourceDescriptor::new("generic");
        let err = test_support::build(&source, &EnrichConfig::default()).unwrap_err();
        assert!(matches!(err, EnrichError::Config { .. }));
        assert!(err.to_string().contains("generic source requires a url"));

        let source = SourceDescriptor::new("generic").with_url("not a url");
        let err = test_support::build(&source, &EnrichConfig::default()).unwrap_err();
        assert!(err.to_string().contains("invalid url"));
    }
}

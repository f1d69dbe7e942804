//! Application configuration for docenrich.
//!
//! User config lives at `~/.docenrich/docenrich.toml`. A `--config` path
//! overrides it; `.toml` files parse as TOML and anything else as JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnrichError, Result};
use crate::types::{SourceDescriptor, SourceGroup};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docenrich.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docenrich";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Sources queried for `external_data`.
    #[serde(default)]
    pub external_data_sources: SourceListConfig,

    /// Sources queried for `internal_data`.
    #[serde(default)]
    pub internal_data_sources: SourceListConfig,

    /// Provider API keys, keyed `<provider>_api_key`.
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,

    /// Provider field defaults. Top-level entries apply to every provider;
    /// a nested table named after a provider applies only to it.
    #[serde(default)]
    pub defaults: Map<String, Value>,

    /// HTTP fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Metadata extraction options.
    #[serde(default)]
    pub metadata: MetadataOptions,

    /// Context extraction options.
    #[serde(default)]
    pub context_options: ContextOptions,

    /// Directory processing options.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl EnrichConfig {
    /// The configured source list for a group.
    pub fn sources(&self, group: SourceGroup) -> &[SourceDescriptor] {
        match group {
            SourceGroup::External => &self.external_data_sources.api_calls,
            SourceGroup::Internal => &self.internal_data_sources.api_calls,
        }
    }
}

/// `{ "api_calls": [...] }` wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceListConfig {
    #[serde(default)]
    pub api_calls: Vec<SourceDescriptor>,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on concurrently running source fetches per aggregation.
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,

    /// User-Agent header for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_sources: default_max_concurrent_sources(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent_sources() -> usize {
    8
}
fn default_user_agent() -> String {
    concat!("docenrich/", env!("CARGO_PKG_VERSION")).into()
}

/// `[metadata]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataOptions {
    /// Prefix for generated keyword links. Required only for `external_links`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Tags attached to every document.
    #[serde(default)]
    pub custom_tags: Vec<String>,

    /// Fields merged into every document's metadata last.
    #[serde(default)]
    pub custom_metadata: Map<String, Value>,

    /// Keyword cap when keywords are derived from term frequency.
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            custom_tags: Vec::new(),
            custom_metadata: Map::new(),
            max_keywords: default_max_keywords(),
        }
    }
}

fn default_max_keywords() -> usize {
    8
}

/// `[context_options]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Paragraphs kept from each end of the document as surrounding text.
    #[serde(default = "default_surrounding")]
    pub num_surrounding_paragraphs: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            num_surrounding_paragraphs: default_surrounding(),
        }
    }
}

fn default_surrounding() -> usize {
    3
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// File extensions (without dot) picked up when walking a directory.
    #[serde(default = "default_extensions")]
    pub supported_extensions: Vec<String>,

    /// Documents enriched at once.
    #[serde(default = "default_document_concurrency")]
    pub document_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            supported_extensions: default_extensions(),
            document_concurrency: default_document_concurrency(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    ["md", "markdown", "txt", "html", "htm", "rst"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_document_concurrency() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docenrich/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| EnrichError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docenrich/docenrich.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the default config file. Returns defaults if the file does not exist.
pub fn load_config() -> Result<EnrichConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(EnrichConfig::default());
    }

    load_config_from(&path)
}

/// Load configuration from a specific TOML or JSON file.
pub fn load_config_from(path: &Path) -> Result<EnrichConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EnrichError::io(path, e))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config: EnrichConfig = if is_toml {
        toml::from_str(&content).map_err(|e| {
            EnrichError::config(format!("failed to parse {}: {e}", path.display()))
        })?
    } else {
        serde_json::from_str(&content).map_err(|e| {
            EnrichError::config(format!("failed to parse {}: {e}", path.display()))
        })?
    };

    tracing::debug!(
        ?path,
        external = config.external_data_sources.api_calls.len(),
        internal = config.internal_data_sources.api_calls.len(),
        "loaded config"
    );
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EnrichError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&EnrichConfig::default())
        .map_err(|e| EnrichError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EnrichError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

//! Shared types, error model, and configuration for docenrich.
//!
//! This crate is the foundation depended on by all other docenrich crates.
//! It provides:
//! - [`EnrichError`]: the unified error type
//! - Domain types ([`Metadata`], [`Context`], [`SourceDescriptor`], [`FetchResult`], [`EnrichedRecord`])
//! - Configuration ([`EnrichConfig`], config loading)
//! - [`CancelSignal`]: the cancellation/deadline signal passed to every fetch

pub mod cancel;
pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use cancel::{CancelHandle, CancelSignal};
pub use config::{
    ContextOptions, EnrichConfig, FetchConfig, MetadataOptions, PipelineConfig, SourceListConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{EnrichError, Result};
pub use types::{Context, EnrichedRecord, FetchResult, Metadata, SourceDescriptor, SourceGroup};

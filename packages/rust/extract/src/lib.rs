//! Document signal extraction: the metadata and context collaborators.
//!
//! The enrichment core depends only on [`MetadataExtractor`] and
//! [`ContextExtractor`]. The heuristic implementations here are model-free
//! defaults; swap in NLP-backed ones by implementing the traits.

mod context;
mod metadata;
pub mod text;

use std::path::Path;

use docenrich_shared::{Context, Metadata, Result};

pub use context::HeuristicContextExtractor;
pub use metadata::HeuristicMetadataExtractor;
pub use text::{read_document, visible_text};

/// Produces a document's [`Metadata`]. Must not have side effects visible to the core.
pub trait MetadataExtractor: Send + Sync {
    fn extract_metadata(&self, path: &Path, text: &str) -> Result<Metadata>;
}

/// Produces a document's [`Context`]. Must not have side effects visible to the core.
pub trait ContextExtractor: Send + Sync {
    fn extract_context(&self, text: &str) -> Result<Context>;
}

//! Enrichment core for docenrich.
//!
//! Ties the extractors and the source layer together:
//! - [`Aggregator`]: seed, fan out over a source list, merge in configuration order
//! - [`Enricher`]: one document in, one [`docenrich_shared::EnrichedRecord`] out
//! - [`process_directory`]: the batch pipeline over a directory tree

pub mod aggregator;
pub mod orchestrator;
pub mod pipeline;

pub use aggregator::Aggregator;
pub use orchestrator::Enricher;
pub use pipeline::{
    OutputFormat, ProcessProgress, ProcessSummary, SilentProgress, collect_documents,
    process_directory, write_records,
};

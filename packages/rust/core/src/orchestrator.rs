//! Per-document enrichment: extract signals, then aggregate both source groups.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use docenrich_extract::{
    ContextExtractor, HeuristicContextExtractor, HeuristicMetadataExtractor, MetadataExtractor,
};
use docenrich_shared::{CancelSignal, EnrichConfig, EnrichedRecord, Result, SourceGroup};
use docenrich_sources::CacheStats;

use crate::aggregator::Aggregator;

/// Turns one document into an [`EnrichedRecord`].
///
/// Extractor failures abort the document. Source failures only leave
/// their part of the aggregate empty.
pub struct Enricher {
    metadata: Box<dyn MetadataExtractor>,
    context: Box<dyn ContextExtractor>,
    aggregator: Aggregator,
}

impl Enricher {
    /// The heuristic extractors with every built-in provider.
    pub fn new(config: EnrichConfig) -> Result<Self> {
        let config = Arc::new(config);
        let metadata = HeuristicMetadataExtractor::new(config.metadata.clone());
        let context = HeuristicContextExtractor::new(config.context_options.clone());
        let aggregator = Aggregator::new(config)?;
        Ok(Self::with_parts(metadata, context, aggregator))
    }

    pub fn with_parts(
        metadata: impl MetadataExtractor + 'static,
        context: impl ContextExtractor + 'static,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            metadata: Box::new(metadata),
            context: Box::new(context),
            aggregator,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.aggregator.cache_stats()
    }

    /// Extract metadata and context, then run the external and internal
    /// aggregations concurrently over the shared cache.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn enrich(
        &self,
        path: &Path,
        text: &str,
        cancel: &CancelSignal,
    ) -> Result<EnrichedRecord> {
        let metadata = self.metadata.extract_metadata(path, text)?;
        let context = self.context.extract_context(text)?;
        debug!(
            keywords = metadata.keywords.len(),
            entities = context.named_entities.len(),
            "extracted document signals"
        );

        let (external_data, internal_data) = tokio::join!(
            self.aggregator
                .integrate_group(SourceGroup::External, &metadata, &context, cancel),
            self.aggregator
                .integrate_group(SourceGroup::Internal, &metadata, &context, cancel),
        );

        info!(
            external = external_data.len(),
            internal = internal_data.len(),
            "document enriched"
        );

        Ok(EnrichedRecord {
            metadata,
            context,
            external_data,
            internal_data,
        })
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("aggregator", &self.aggregator)
            .finish_non_exhaustive()
    }
}

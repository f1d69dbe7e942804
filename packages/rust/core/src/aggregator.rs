//! Seeds and merges one aggregate from a document's signals and a source list.
//!
//! Input shape is enforced when [`Metadata`] and [`Context`] are built, so
//! aggregation itself never fails. A source that cannot be shaped, fetched,
//! or decoded contributes nothing.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use docenrich_shared::{
    CancelSignal, Context, EnrichConfig, FetchResult, Metadata, Result,
    SourceDescriptor, SourceGroup,
};
use docenrich_sources::{
    Cache, CacheOutcome, CacheStats, FieldResolver, ProviderDefaults, SourceFetcher,
    SourceRegistry,
};

/// Placeholder seed texts, per source group.
struct SeedText {
    entity_details: &'static str,
    related_topics: [&'static str; 2],
}

static EXTERNAL_SEED: SeedText = SeedText {
    entity_details: "Simulated entity details from external source.",
    related_topics: ["Topic 1", "Topic 2"],
};

static INTERNAL_SEED: SeedText = SeedText {
    entity_details: "Simulated entity details for internal use.",
    related_topics: ["Internal Topic 1", "Internal Topic 2"],
};

fn seed_text(group: SourceGroup) -> &'static SeedText {
    match group {
        SourceGroup::External => &EXTERNAL_SEED,
        SourceGroup::Internal => &INTERNAL_SEED,
    }
}

/// Runs aggregation passes against a shared registry, fetcher and cache.
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    fetcher: SourceFetcher,
    cache: Arc<Cache>,
    config: Arc<EnrichConfig>,
}

impl Aggregator {
    /// An aggregator with every built-in provider and a fresh cache.
    pub fn new(config: Arc<EnrichConfig>) -> Result<Self> {
        let fetcher = SourceFetcher::new(&config.fetch)?;
        Ok(Self {
            registry: Arc::new(SourceRegistry::new()),
            fetcher,
            cache: Arc::new(Cache::new()),
            config,
        })
    }

    /// Replace the adapter registry.
    pub fn with_registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Share an existing cache.
    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// [`Aggregator::integrate`] over the group's configured source list.
    pub async fn integrate_group(
        &self,
        group: SourceGroup,
        metadata: &Metadata,
        context: &Context,
        cancel: &CancelSignal,
    ) -> FetchResult {
        self.integrate(group, metadata, context, self.config.sources(group), cancel)
            .await
    }

    /// Seed from `metadata`/`context`, then fetch every source concurrently
    /// and merge the results in `sources` order (later sources win).
    ///
    /// Source failures and cancellation only empty that source's share.
    #[instrument(skip_all, fields(group = %group, sources = sources.len()))]
    pub async fn integrate(
        &self,
        group: SourceGroup,
        metadata: &Metadata,
        context: &Context,
        sources: &[SourceDescriptor],
        cancel: &CancelSignal,
    ) -> FetchResult {
        let mut aggregate = seed(group, metadata, context);

        let limit = Semaphore::new(self.config.fetch.max_concurrent_sources.max(1));
        let contributions = join_all(
            sources
                .iter()
                .enumerate()
                .map(|(index, source)| self.dispatch(index, source, &limit, cancel)),
        )
        .await;

        for contribution in contributions {
            aggregate.merge(contribution);
        }

        debug!(keys = aggregate.len(), "aggregation complete");
        aggregate
    }

    /// Fetch one source. Every failure collapses to an empty contribution.
    async fn dispatch(
        &self,
        index: usize,
        source: &SourceDescriptor,
        limit: &Semaphore,
        cancel: &CancelSignal,
    ) -> FetchResult {
        let Some(adapter) = self.registry.resolve(&source.kind) else {
            debug!(index, kind = %source.kind, "no adapter registered, skipping source");
            return FetchResult::new();
        };

        let fields = FieldResolver::new(
            adapter.name(),
            source,
            ProviderDefaults::from(self.config.as_ref()),
        );
        let request = match adapter.build(source, &fields) {
            Ok(request) => request,
            Err(e) => {
                warn!(index, kind = %source.kind, url = source.url_for_log(), error = %e, "skipping misconfigured source");
                return FetchResult::new();
            }
        };

        let fingerprint = request.fingerprint();
        let fetched = async {
            let _permit = limit.acquire().await.ok()?;
            Some(
                self.cache
                    .get_or_fetch(&fingerprint, || self.fetcher.fetch(&request, cancel))
                    .await,
            )
        };

        // A caller joining someone else's in-flight fetch still honours its
        // own signal.
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(index, kind = %source.kind, "source abandoned on cancellation");
                return FetchResult::new();
            }
            outcome = fetched => outcome,
        };

        match outcome {
            Some(Ok((result, outcome))) => {
                debug!(
                    index,
                    kind = %source.kind,
                    cached = outcome == CacheOutcome::Hit,
                    keys = result.len(),
                    "source contributed"
                );
                result
            }
            // Already logged by the fetcher.
            Some(Err(e)) => {
                debug!(index, kind = %source.kind, error = %e, "source contributed nothing");
                FetchResult::new()
            }
            None => FetchResult::new(),
        }
    }
}

/// Entities first, then keywords; a keyword equal to an entity replaces it.
/// Blank entries name nothing and are not seeded.
fn seed(group: SourceGroup, metadata: &Metadata, context: &Context) -> FetchResult {
    let text = seed_text(group);
    let mut seeded = FetchResult::new();

    for entity in context.named_entities.iter().filter(|e| !e.trim().is_empty()) {
        seeded.insert(
            entity.clone(),
            json!({ "entity": entity, "details": text.entity_details }),
        );
    }
    for keyword in metadata.keywords.iter().filter(|k| !k.trim().is_empty()) {
        seeded.insert(
            keyword.clone(),
            json!({ "keyword": keyword, "related_topics": text.related_topics }),
        );
    }
    seeded
}

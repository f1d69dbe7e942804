//! Process-lifetime fetch cache keyed by request fingerprint.
//!
//! Each fingerprint owns a slot that is filled at most once per fetch, so
//! concurrent callers with the same fingerprint share a single in-flight
//! request. Failed fetches leave the slot empty and are never cached.
//! There is no expiry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use docenrich_shared::{FetchResult, Result};

use crate::request::Fingerprint;

type Slot = Arc<OnceCell<FetchResult>>;

/// Where a cached lookup's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from a completed entry or a coalesced in-flight fetch.
    Hit,
    /// This caller performed the fetch.
    Miss,
}

/// Hit/miss counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Shared, concurrency-safe fetch cache.
#[derive(Debug, Default)]
pub struct Cache {
    slots: Mutex<HashMap<Fingerprint, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored result for `fingerprint`, if a fetch has completed.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<FetchResult> {
        let slots = self.slots.lock().await;
        slots.get(fingerprint).and_then(|slot| slot.get().cloned())
    }

    /// Store `result`, replacing any previous value (last writer wins).
    pub async fn put(&self, fingerprint: Fingerprint, result: FetchResult) {
        let slot = Arc::new(OnceCell::new_with(Some(result)));
        self.slots.lock().await.insert(fingerprint, slot);
    }

    /// Return the cached result, or run `fetch` and cache its success.
    ///
    /// Callers racing on the same fingerprint wait for the first caller's
    /// fetch instead of issuing their own. If that fetch fails, the next
    /// waiter tries again.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        fetch: F,
    ) -> Result<(FetchResult, CacheOutcome)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FetchResult>>,
    {
        let slot: Slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(fingerprint.clone()).or_default().clone()
        };

        if let Some(value) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%fingerprint, "cache hit");
            return Ok((value.clone(), CacheOutcome::Hit));
        }

        let mut fetched = false;
        let value = slot
            .get_or_try_init(|| {
                fetched = true;
                fetch()
            })
            .await?;

        let outcome = if fetched {
            self.misses.fetch_add(1, Ordering::Relaxed);
            CacheOutcome::Miss
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%fingerprint, "joined in-flight fetch");
            CacheOutcome::Hit
        };
        Ok((value.clone(), outcome))
    }

    /// Number of completed entries.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use docenrich_shared::EnrichError;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::request::SourceRequest;

    fn fp(path: &str) -> Fingerprint {
        SourceRequest::get("generic", Url::parse(&format!("https://api.example.com/{path}")).unwrap())
            .fingerprint()
    }

    fn result(key: &str, value: i64) -> FetchResult {
        FetchResult::from_body("generic", json!({ key: value }))
    }

    #[tokio::test]
    async fn get_misses_then_hits_after_put() {
        let cache = Cache::new();
        assert!(cache.get(&fp("a")).await.is_none());

        cache.put(fp("a"), result("x", 1)).await;
        assert_eq!(cache.get(&fp("a")).await, Some(result("x", 1)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn put_is_last_writer_wins() {
        let cache = Cache::new();
        cache.put(fp("a"), result("x", 1)).await;
        cache.put(fp("a"), result("x", 2)).await;
        assert_eq!(cache.get(&fp("a")).await, Some(result("x", 2)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let cache = Cache::new();
        let calls = AtomicUsize::new(0);

        for expected in [CacheOutcome::Miss, CacheOutcome::Hit] {
            let (value, outcome) = cache
                .get_or_fetch(&fp("a"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(result("x", 1))
                })
                .await
                .expect("fetch ok");
            assert_eq!(value, result("x", 1));
            assert_eq!(outcome, expected);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = Cache::new();

        let err = cache
            .get_or_fetch(&fp("a"), || async {
                Err(EnrichError::source_fetch("generic", "u", "HTTP 500"))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.get(&fp("a")).await.is_none());
        assert!(cache.is_empty().await);

        let (value, outcome) = cache
            .get_or_fetch(&fp("a"), || async { Ok(result("x", 1)) })
            .await
            .expect("retry succeeds");
        assert_eq!(value, result("x", 1));
        assert_eq!(outcome, CacheOutcome::Miss);
    }

    /// Coalescing concurrent identical requests is an optional strengthening
    /// of the at-most-one-inflight policy.
    #[tokio::test]
    async fn concurrent_identical_fetches_coalesce() {
        let cache = Arc::new(Cache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_fetch(&fp("shared"), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(result("x", 7))
                        })
                        .await
                })
            })
            .collect();

        for outcome in futures::future::join_all(tasks).await {
            let (value, _) = outcome.expect("join").expect("fetch ok");
            assert_eq!(value, result("x", 7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 7);
    }
}

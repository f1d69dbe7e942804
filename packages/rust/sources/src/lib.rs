//! Source dispatch: provider adapters, request fingerprinting, the shared
//! fetch cache, and the HTTP fetcher.
//!
//! This crate provides:
//! - [`adapters`]: [`SourceAdapter`] implementations per provider and the [`SourceRegistry`]
//! - [`FieldResolver`]: override → defaults → literal field resolution
//! - [`Cache`]: fingerprint-keyed, single-flight result cache
//! - [`SourceFetcher`]: one request in, one [`docenrich_shared::FetchResult`] or classified error out

pub mod adapters;
pub mod cache;
pub mod fetcher;
pub mod request;
pub mod resolve;

pub use adapters::{
    GenericAdapter, GoogleAdapter, HuggingFaceAdapter, NotionAdapter, OpenAiAdapter,
    SourceAdapter, SourceRegistry,
};
pub use cache::{Cache, CacheOutcome, CacheStats};
pub use fetcher::SourceFetcher;
pub use request::{Fingerprint, HttpMethod, SourceRequest};
pub use resolve::{FieldResolver, ProviderDefaults};

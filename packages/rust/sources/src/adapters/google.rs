//! Google Custom Search: `GET customsearch/v1?key&cx&q`.

use docenrich_shared::{Result, SourceDescriptor};

use super::{SourceAdapter, url_or_default};
use crate::request::SourceRequest;
use crate::resolve::FieldResolver;

/// Fixed search endpoint; a descriptor `url` replaces it.
pub const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

pub struct GoogleAdapter;

impl SourceAdapter for GoogleAdapter {
    fn name(&self) -> &'static str {
        "google"
    }

    fn shape(&self, source: &SourceDescriptor, fields: &FieldResolver<'_>) -> Result<SourceRequest> {
        let url = url_or_default(source, self.name(), GOOGLE_SEARCH_URL)?;
        Ok(SourceRequest::get(self.name(), url)
            .with_query(source.params.clone())
            .with_query_param("key", fields.api_key())
            .with_query_param("cx", fields.resolve_str("cx", ""))
            .with_query_param("q", fields.resolve_str("query", "")))
    }
}

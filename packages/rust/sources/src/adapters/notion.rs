//! Notion API: `GET url` with the `Notion-Version` header.

use docenrich_shared::{Result, SourceDescriptor};

use super::{SourceAdapter, required_url};
use crate::request::SourceRequest;
use crate::resolve::FieldResolver;

/// Notion API version sent when none is configured.
pub const NOTION_VERSION: &str = "2022-06-28";

pub struct NotionAdapter;

impl SourceAdapter for NotionAdapter {
    fn name(&self) -> &'static str {
        "notion"
    }

    fn shape(&self, source: &SourceDescriptor, fields: &FieldResolver<'_>) -> Result<SourceRequest> {
        let url = required_url(source, self.name())?;
        Ok(SourceRequest::get(self.name(), url)
            .with_header(
                "Notion-Version",
                fields.resolve_str("notion_version", NOTION_VERSION),
            )
            .with_bearer(&fields.api_key()))
    }
}

//! Generic JSON API: `GET url?params`.

use docenrich_shared::{Result, SourceDescriptor};

use super::{SourceAdapter, required_url};
use crate::request::SourceRequest;
use crate::resolve::FieldResolver;

pub struct GenericAdapter;

impl SourceAdapter for GenericAdapter {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn shape(&self, source: &SourceDescriptor, _fields: &FieldResolver<'_>) -> Result<SourceRequest> {
        let url = required_url(source, self.name())?;
        Ok(SourceRequest::get(self.name(), url).with_query(source.params.clone()))
    }
}

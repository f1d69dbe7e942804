//! Hugging Face inference: `POST url` with `{inputs, parameters, options}`.

use serde_json::json;

use docenrich_shared::{Result, SourceDescriptor};

use super::{SourceAdapter, required_url};
use crate::request::SourceRequest;
use crate::resolve::FieldResolver;

pub struct HuggingFaceAdapter;

impl SourceAdapter for HuggingFaceAdapter {
    fn name(&self) -> &'static str {
        "hugging_face"
    }

    fn shape(&self, source: &SourceDescriptor, fields: &FieldResolver<'_>) -> Result<SourceRequest> {
        let url = required_url(source, self.name())?;
        let body = json!({
            "inputs": fields.resolve("inputs", json!("")),
            "parameters": fields.resolve("parameters", json!({})),
            "options": fields.resolve("options", json!({})),
        });
        Ok(SourceRequest::post(self.name(), url)
            .with_bearer(&fields.api_key())
            .with_json(body))
    }
}

//! OpenAI answers endpoint: `POST` with a JSON question payload.

use serde_json::json;

use docenrich_shared::{Result, SourceDescriptor};

use super::{SourceAdapter, url_or_default};
use crate::request::SourceRequest;
use crate::resolve::FieldResolver;

/// Fixed endpoint; a descriptor `url` replaces it.
pub const OPENAI_ANSWERS_URL: &str = "https://api.openai.com/v1/answers";

pub struct OpenAiAdapter;

impl SourceAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn shape(&self, source: &SourceDescriptor, fields: &FieldResolver<'_>) -> Result<SourceRequest> {
        let url = url_or_default(source, self.name(), OPENAI_ANSWERS_URL)?;
        let body = json!({
            "model": fields.resolve("model", json!("text-davinci-003")),
            "question": fields.resolve("question", json!("")),
            "documents": fields.resolve("documents", json!([])),
            "examples_context": fields.resolve("examples_context", json!("")),
            "examples": fields.resolve("examples", json!([])),
            "max_tokens": fields.resolve("max_tokens", json!(100)),
            "stop": fields.resolve("stop", json!(["\n", "\n\n"])),
        });
        Ok(SourceRequest::post(self.name(), url)
            .with_bearer(&fields.api_key())
            .with_json(body))
    }
}

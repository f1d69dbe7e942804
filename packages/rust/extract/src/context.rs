//! Heuristic context extraction (named entities, surrounding text, headers).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use docenrich_shared::{Context, ContextOptions, Result};

use crate::ContextExtractor;
use crate::text::{paragraphs, visible_text};

/// Runs of two or more capitalized words, e.g. "Ada Lovelace".
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+\b").expect("valid regex")
});

/// Model-free [`ContextExtractor`].
#[derive(Debug, Clone, Default)]
pub struct HeuristicContextExtractor {
    options: ContextOptions,
}

impl HeuristicContextExtractor {
    pub fn new(options: ContextOptions) -> Self {
        Self { options }
    }
}

impl ContextExtractor for HeuristicContextExtractor {
    fn extract_context(&self, text: &str) -> Result<Context> {
        let plain = visible_text(text);
        let paras = paragraphs(&plain);
        let (headers, body): (Vec<&String>, Vec<&String>) =
            paras.iter().partition(|p| p.starts_with("# "));

        let mut seen = HashSet::new();
        let named_entities: Vec<String> = body
            .iter()
            .flat_map(|p| ENTITY_RE.find_iter(p))
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|e| seen.insert(e.clone()))
            .collect();

        let section_headers: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches("# ").trim())
            .collect();

        let mut context = Context {
            named_entities,
            ..Default::default()
        };
        context.set("surrounding_text", json!(surrounding(&paras, self.options.num_surrounding_paragraphs)));
        context.set("section_headers", json!(section_headers));
        Ok(context)
    }
}

/// First and last `n` paragraphs, without repeating any when they overlap.
fn surrounding(paras: &[String], n: usize) -> Vec<String> {
    if paras.len() <= n.saturating_mul(2) {
        return paras.to_vec();
    }
    paras[..n]
        .iter()
        .chain(&paras[paras.len() - n..])
        .cloned()
        .collect()
}

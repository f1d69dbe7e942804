//! Heuristic metadata extraction (title, keywords, sections, links, ...).

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Value, json};
use tracing::{debug, warn};

use docenrich_shared::{EnrichError, Metadata, MetadataOptions, Result};

use crate::MetadataExtractor;
use crate::text::{looks_like_html, paragraphs, truncate_chars, visible_text};

/// Longest generated description, in characters.
const DESCRIPTION_MAX_CHARS: usize = 280;

/// Words ignored when ranking keywords by frequency.
const STOPWORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "being", "between", "both", "could", "does",
    "each", "from", "have", "here", "into", "just", "like", "more", "most", "much", "must",
    "only", "other", "over", "same", "should", "some", "such", "than", "that", "their", "them",
    "then", "there", "these", "they", "this", "those", "through", "under", "very", "were",
    "what", "when", "where", "which", "while", "will", "with", "would", "your", "you're",
];

static MD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.+?)[ \t#]*$").expect("valid regex"));
static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("valid regex"));
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9_'-]{3,}").expect("valid regex"));

/// Model-free [`MetadataExtractor`] driven by [`MetadataOptions`].
#[derive(Debug, Clone, Default)]
pub struct HeuristicMetadataExtractor {
    options: MetadataOptions,
}

impl HeuristicMetadataExtractor {
    pub fn new(options: MetadataOptions) -> Self {
        Self { options }
    }

    /// `base_url + slug(keyword)` for every keyword.
    ///
    /// Fails with a config error when no base URL is configured; callers
    /// drop just this field in that case.
    pub fn external_links(&self, keywords: &[String]) -> Result<Vec<String>> {
        let base = self
            .options
            .base_url
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| EnrichError::config("metadata.base_url is required for external links"))?;

        Ok(keywords
            .iter()
            .map(|k| format!("{base}{}", k.replace(' ', "-").to_lowercase()))
            .collect())
    }

    fn keywords(&self, html: Option<&Html>, plain: &str) -> Vec<String> {
        if let Some(doc) = html {
            static META_SEL: LazyLock<Selector> = LazyLock::new(|| {
                Selector::parse(r#"meta[name="keywords"]"#).expect("valid selector")
            });
            if let Some(content) = doc
                .select(&META_SEL)
                .next()
                .and_then(|el| el.value().attr("content"))
            {
                return content
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect();
            }
        }
        rank_terms(plain, self.options.max_keywords)
    }
}

impl MetadataExtractor for HeuristicMetadataExtractor {
    fn extract_metadata(&self, path: &Path, text: &str) -> Result<Metadata> {
        let html = looks_like_html(text).then(|| Html::parse_document(text));
        let plain = visible_text(text);
        let paras = paragraphs(&plain);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = html
            .as_ref()
            .and_then(html_title)
            .or_else(|| markdown_title(&plain))
            .unwrap_or(file_name);

        let description = paras
            .iter()
            .find(|p| !p.starts_with('#'))
            .map(|p| truncate_chars(p, DESCRIPTION_MAX_CHARS))
            .unwrap_or_default();

        let sections: Vec<String> = MD_HEADING_RE
            .captures_iter(&plain)
            .map(|c| c[1].trim().to_string())
            .collect();

        let in_text_references: Vec<String> = REFERENCE_RE
            .captures_iter(&plain)
            .map(|c| c[1].trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        let keywords = self.keywords(html.as_ref(), &plain);
        let code_examples = text.contains("```") || text.contains("<code") || text.contains("<pre");
        let content_type = if path.to_string_lossy().to_lowercase().contains("tutorial") {
            "Tutorial"
        } else {
            "Guide"
        };

        let mut metadata = Metadata {
            keywords,
            ..Default::default()
        };
        metadata.set("title", title);
        metadata.set("description", description);
        metadata.set("sections", json!(sections));
        metadata.set("code_examples", code_examples);
        metadata.set("content_type", content_type);
        metadata.set(
            "publication_date",
            chrono::Local::now().format("%Y-%m-%d").to_string(),
        );
        metadata.set("file_path", path.to_string_lossy().into_owned());
        metadata.set("tags", json!(self.options.custom_tags));
        metadata.set("in_text_references", json!(in_text_references));

        match self.external_links(&metadata.keywords) {
            Ok(links) => metadata.set("external_links", json!(links)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping external links"),
        }

        apply_custom_metadata(&mut metadata, &self.options)?;

        debug!(
            path = %path.display(),
            keywords = metadata.keywords.len(),
            "extracted metadata"
        );
        Ok(metadata)
    }
}

fn html_title(doc: &Html) -> Option<String> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title, h1").expect("valid selector"));
    doc.select(&TITLE_SEL)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

fn markdown_title(plain: &str) -> Option<String> {
    plain
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The most frequent non-stopword terms, ties broken by first appearance.
fn rank_terms(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, m) in WORD_RE.find_iter(text).enumerate() {
        let word = m.as_str().to_lowercase();
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
    ranked.into_iter().take(limit).map(|(w, _)| w).collect()
}

/// Merge configured custom metadata last. A `keywords` override must be a
/// list of strings.
fn apply_custom_metadata(metadata: &mut Metadata, options: &MetadataOptions) -> Result<()> {
    for (key, value) in &options.custom_metadata {
        if key == "keywords" {
            metadata.keywords = serde_json::from_value::<Vec<String>>(value.clone()).map_err(|_| {
                EnrichError::input_shape("metadata.custom_metadata.keywords must be a list of strings")
            })?;
        } else {
            metadata.fields.insert(key.clone(), value.clone());
        }
    }
    Ok(())
}

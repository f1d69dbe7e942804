//! Raw document loading and plain-text helpers.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use docenrich_shared::{EnrichError, Result};

/// Read a document as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| EnrichError::io(path, e))?;
    String::from_utf8(bytes)
        .map_err(|e| EnrichError::parse(format!("{} is not valid UTF-8: {e}", path.display())))
}

/// Whether `text` should be treated as HTML.
pub(crate) fn looks_like_html(text: &str) -> bool {
    let head: String = text.trim_start().chars().take(256).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<body")
}

/// Visible text of an HTML document; non-HTML input is returned unchanged.
///
/// Block-level elements become paragraphs separated by blank lines so the
/// output splits the same way plain text does.
pub fn visible_text(text: &str) -> String {
    if !looks_like_html(text) {
        return text.to_string();
    }

    static BLOCK_SEL: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("body h1, body h2, body h3, body h4, body h5, body h6, body p, body li, body pre")
            .expect("valid selector")
    });

    let doc = Html::parse_document(text);
    let blocks: Vec<String> = doc
        .select(&BLOCK_SEL)
        .map(|el| {
            let inner = collapse_whitespace(&el.text().collect::<String>());
            match el.value().name() {
                "h1" => format!("# {inner}"),
                _ => inner,
            }
        })
        .filter(|block| !block.is_empty())
        .collect();

    blocks.join("\n\n")
}

/// Split text into trimmed, non-empty paragraphs on blank lines.
pub(crate) fn paragraphs(text: &str) -> Vec<String> {
    static BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("valid regex"));

    BLANK_RE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

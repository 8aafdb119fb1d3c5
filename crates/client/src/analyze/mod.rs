//! Content analysis for probed pages.
//!
//! A 200 response is not proof of a live citation. The analyzer looks for
//! error pages served as 200 (soft-404s), parked or placeholder domains, and
//! computes a normalized content hash used for drift detection.
//!
//! All functions here are pure.

pub mod normalize;
pub mod parked;
pub mod soft404;

use scraper::{Html, Node, Selector};
use srcwatch_core::cache::hash::content_hash;
use std::sync::LazyLock;

pub use normalize::normalize_for_hash;
pub use parked::is_parked;
pub use soft404::is_soft_404;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("invalid selector"));

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("invalid selector"));

/// Elements whose text never reaches the reader.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Verdict for one page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAnalysis {
    pub is_soft_404: bool,
    pub is_parked_domain: bool,
    /// SHA-256 hex of the normalized HTML.
    pub content_hash: String,
}

/// Analyze a page body and its title.
pub fn analyze(html: &str, title: &str) -> ContentAnalysis {
    let document = Html::parse_document(html);
    let title = title.to_lowercase();
    let body_text = visible_text(&document);

    ContentAnalysis {
        is_soft_404: is_soft_404(&document, &title, &body_text),
        is_parked_domain: is_parked(&document, &title, &body_text),
        content_hash: content_hash(&normalize_for_hash(html)),
    }
}

/// Text of the first `<title>`, whitespace collapsed. Empty if absent.
pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&TITLE)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default()
}

/// Lower-cased visible body text with whitespace collapsed.
pub(crate) fn visible_text(document: &Html) -> String {
    let Some(body) = document.select(&BODY).next() else {
        return String::new();
    };

    let mut text = String::new();
    for node in body.descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(|el| HIDDEN_TAGS.contains(&el.name()));
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }

    collapse_whitespace(&text).to_lowercase()
}

/// First phrase contained in `text`.
pub(crate) fn find_phrase<'p>(text: &str, phrases: &[&'p str]) -> Option<&'p str> {
    phrases.iter().copied().find(|p| text.contains(p))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

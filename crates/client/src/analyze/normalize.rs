//! HTML normalization ahead of content hashing.
//!
//! Strips the parts of a page that change on every request (scripts, build
//! ids, CSRF tokens, timestamps) so the hash only moves when the visible
//! rules move.

use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("invalid script regex"));

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("invalid style regex"));

static VOLATILE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s(?:id|class|data-[\w-]+|aria-[\w-]+)\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("invalid attribute regex")
});

static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("invalid timestamp regex")
});

static HEX_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[0-9a-f]{32,}\b").expect("invalid hex regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

/// Normalize raw HTML so that equivalent page loads produce identical text.
pub fn normalize_for_hash(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = VOLATILE_ATTR.replace_all(&text, "");
    let text = ISO_TIMESTAMP.replace_all(&text, "");
    let text = HEX_TOKEN.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_and_styles() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script type="text/javascript">var nonce = 42;</script></head>
            <body><p>Rinse containers.</p><SCRIPT>track()</SCRIPT></body></html>"#;
        let normalized = normalize_for_hash(html);
        assert!(!normalized.contains("nonce"));
        assert!(!normalized.contains("color"));
        assert!(!normalized.contains("track"));
        assert!(normalized.contains("<p>Rinse containers.</p>"));
    }

    #[test]
    fn test_strips_volatile_attributes() {
        let a = r#"<div id="x1" class="a b" data-build="991" aria-label="Menu">Glass</div>"#;
        let b = r#"<div id="x2" class='c' data-build=992 aria-label="Nav">Glass</div>"#;
        assert_eq!(normalize_for_hash(a), "<div>Glass</div>");
        assert_eq!(normalize_for_hash(a), normalize_for_hash(b));
    }

    #[test]
    fn test_keeps_href_attributes() {
        let html = r#"<a class="btn" href="/carts">Carts</a>"#;
        assert_eq!(normalize_for_hash(html), r#"<a href="/carts">Carts</a>"#);
    }

    #[test]
    fn test_strips_timestamps_and_tokens() {
        let a = "<p>Updated 2026-03-01T10:15:00Z</p><input value=\"0123456789abcdef0123456789abcdef\">";
        let b = "<p>Updated 2026-04-11 08:00:01.123+02:00</p><input value=\"fedcba9876543210fedcba9876543210ff\">";
        assert_eq!(normalize_for_hash(a), normalize_for_hash(b));
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize_for_hash("  <p>Paper\n\n   and\tcardboard</p>  "), "<p>Paper and cardboard</p>");
    }

    #[test]
    fn test_visible_change_is_preserved() {
        assert_ne!(
            normalize_for_hash("<p>Pizza boxes go in compost.</p>"),
            normalize_for_hash("<p>Pizza boxes go in trash.</p>")
        );
    }
}

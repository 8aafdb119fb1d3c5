//! Parked and placeholder domain detection.
//!
//! An expired municipal microsite is often bought by a domain parker and
//! filled with sponsored links, or left on a web server's default page.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::find_phrase;

const PARKED_PHRASES: &[&str] = &[
    "domain for sale",
    "buy this domain",
    "this domain may be for sale",
    "this domain is for sale",
    "domain is parked",
    "parked free",
    "welcome to nginx",
    "related searches",
];

/// Too common in body copy ("new carts coming soon") to trust outside the title.
const TITLE_ONLY_PHRASES: &[&str] = &["coming soon"];

const AD_TOKENS: &[&str] = &[
    "ad",
    "ads",
    "adclick",
    "sponsor",
    "sponsored",
    "affiliate",
    "aff",
    "parking",
    "parked",
    "doubleclick",
];

const AD_TOKEN_STEMS: &[&str] = &["sponsor", "affiliate", "parking"];

/// The ad-link ratio only applies to pages with more anchors than this.
pub const MIN_ANCHORS: usize = 5;

static APACHE_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bapache.{0,40}\bdefault page").expect("invalid apache regex"));

static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector"));

/// Whether the page looks like a parked or placeholder domain.
///
/// `title` and `body_text` must already be lower-cased.
pub fn is_parked(document: &Html, title: &str, body_text: &str) -> bool {
    let title_hit = find_phrase(title, PARKED_PHRASES)
        .or_else(|| find_phrase(title, TITLE_ONLY_PHRASES))
        .is_some()
        || APACHE_DEFAULT.is_match(title);
    if title_hit {
        tracing::debug!(title, "parked signal in title");
        return true;
    }

    if let Some(phrase) = find_phrase(body_text, PARKED_PHRASES) {
        tracing::debug!(phrase, "parked signal in body");
        return true;
    }
    if APACHE_DEFAULT.is_match(body_text) {
        tracing::debug!("web server default page");
        return true;
    }

    let (total, ads) = ad_link_counts(document);
    if total > MIN_ANCHORS && ads * 2 > total {
        tracing::debug!(total, ads, "page is mostly ad links");
        return true;
    }

    false
}

/// Number of `<a href>` anchors, and how many of them look like ad links.
pub fn ad_link_counts(document: &Html) -> (usize, usize) {
    let mut total = 0;
    let mut ads = 0;
    for anchor in document.select(&ANCHORS) {
        total += 1;
        let el = anchor.value();
        let href = el.attr("href").unwrap_or_default();
        let rel = el.attr("rel").unwrap_or_default();
        if has_ad_token(href) || has_ad_token(rel) {
            ads += 1;
        }
    }
    (total, ads)
}

fn has_ad_token(value: &str) -> bool {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .any(|t| AD_TOKENS.contains(&t.as_str()) || AD_TOKEN_STEMS.iter().any(|s| t.contains(s)))
}

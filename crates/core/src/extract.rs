//! Citation extraction from free-form guidance text.
//!
//! Older rule text carries its citations inline ("Call (510) 555-1234 or
//! visit www.stopwaste.org"). This splits URLs, phone numbers and facility
//! names out into [`SourceMetadata`] and returns the remaining prose.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::model::SourceMetadata;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?://|www\.)[^\s<>]+").expect("invalid url regex"));

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?:Call|Phone|Contact)\s*:?\s*)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").expect("invalid phone regex")
});

static FACILITY_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\s+(?:Transfer Station|Recycling Center|HHW|Household Hazardous Waste)\b",
    )
    .expect("invalid facility regex")
});

static FACILITY_VISIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Drop off at|Visit)\s+([A-Z][^.!?]*?(?:Station|Center|Facility))")
        .expect("invalid facility regex")
});

static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("invalid space regex"));

static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?])").expect("invalid punctuation regex"));

/// Guidance text with its inline citations separated out.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSources {
    pub cleaned_text: String,
    pub sources: Vec<SourceMetadata>,
}

/// Split inline URLs, phone numbers and facility names out of guidance text.
///
/// URLs come back unverified (they still need probing); phone numbers and
/// facility names are verified as of now.
pub fn extract_sources(guidance_text: &str) -> ExtractedSources {
    let now = Utc::now();
    let mut sources = Vec::new();
    let mut cleaned = guidance_text.to_string();

    for m in URL_RE.find_iter(guidance_text) {
        let raw = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        let url = if raw.starts_with("http") { raw.to_string() } else { format!("https://{raw}") };
        if !sources.iter().any(|s: &SourceMetadata| s.value == url) {
            sources.push(SourceMetadata::url_candidate(None, url));
        }
        cleaned = cleaned.replacen(raw, "", 1);
    }

    let without_urls = cleaned.clone();
    for m in PHONE_RE.find_iter(&without_urls) {
        let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 10 {
            continue;
        }
        if !sources.iter().any(|s| s.value == digits) {
            sources.push(SourceMetadata::phone(digits, now));
        }
        cleaned = cleaned.replacen(m.as_str(), "", 1);
    }

    let mut facilities: Vec<String> = FACILITY_SUFFIX_RE
        .find_iter(guidance_text)
        .map(|m| m.as_str().trim().to_string())
        .collect();
    facilities.extend(
        FACILITY_VISIT_RE
            .captures_iter(guidance_text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string()),
    );
    for name in facilities {
        if !sources.iter().any(|s| s.value == name) {
            sources.push(SourceMetadata::facility(name, now));
        }
    }

    let cleaned = MULTI_SPACE_RE.replace_all(&cleaned, " ");
    let cleaned = SPACE_BEFORE_PUNCT_RE.replace_all(&cleaned, "$1");

    ExtractedSources { cleaned_text: cleaned.trim().to_string(), sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SourceKind, Stability};

    #[test]
    fn test_extracts_url_and_normalizes_www() {
        let extracted = extract_sources("Flatten boxes first. See www.stopwaste.org for details.");
        assert_eq!(extracted.sources.len(), 1);
        assert_eq!(extracted.sources[0].kind, SourceKind::Url);
        assert_eq!(extracted.sources[0].value, "https://www.stopwaste.org");
        assert_eq!(extracted.sources[0].stability, Stability::High);
        assert!(!extracted.sources[0].verified);
        assert_eq!(extracted.cleaned_text, "Flatten boxes first. See for details.");
    }

    #[test]
    fn test_extracts_phone_digits() {
        let extracted = extract_sources("Greasy boxes go in compost. Call (510) 555-1234 with questions.");
        let phone = extracted.sources.iter().find(|s| s.kind == SourceKind::Phone).unwrap();
        assert_eq!(phone.value, "5105551234");
        assert!(phone.verified);
        assert!(!extracted.cleaned_text.contains("555"));
    }

    #[test]
    fn test_ignores_short_numbers() {
        let extracted = extract_sources("Limit 3 bags per week, 25 lbs each.");
        assert!(extracted.sources.is_empty());
    }

    #[test]
    fn test_extracts_facility_names() {
        let extracted =
            extract_sources("Batteries are hazardous. Drop off at the Davis Street Transfer Station on Saturdays.");
        let facilities: Vec<_> = extracted
            .sources
            .iter()
            .filter(|s| s.kind == SourceKind::Facility)
            .map(|s| s.value.as_str())
            .collect();
        assert!(facilities.contains(&"Davis Street Transfer Station"));
        assert!(facilities.iter().all(|f| !f.is_empty()));
    }

    #[test]
    fn test_url_inside_text_does_not_yield_phone() {
        let extracted = extract_sources("Details at https://example.gov/rules/5105551234 today.");
        assert_eq!(extracted.sources.len(), 1);
        assert_eq!(extracted.sources[0].kind, SourceKind::Url);
    }

    #[test]
    fn test_plain_text_passes_through() {
        let extracted = extract_sources("Rinse containers before recycling.");
        assert!(extracted.sources.is_empty());
        assert_eq!(extracted.cleaned_text, "Rinse containers before recycling.");
    }
}

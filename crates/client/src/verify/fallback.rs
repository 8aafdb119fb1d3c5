//! Directory-search fallback shown when no citation survives.

use srcwatch_core::{RuleSource, SourceMetadata};
use url::form_urlencoded;

pub const DIRECTORY_NAME: &str = "Earth911 Recycling Search";

const DIRECTORY_SEARCH: &str = "https://search.earth911.com/?what=recycling&where=";

/// Earth911 search link for a location.
///
/// Spaces are encoded as `%20`; a literal `+` is serialized as `%2B`.
pub fn directory_url(location: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(location.trim().as_bytes()).collect();
    format!("{DIRECTORY_SEARCH}{}", encoded.replace('+', "%20"))
}

pub fn directory_fallback(location: &str) -> SourceMetadata {
    SourceMetadata::directory(DIRECTORY_NAME, directory_url(location))
}

/// Same fallback in the location-rules citation shape.
pub fn rule_source_fallback(city: &str) -> RuleSource {
    RuleSource { name: DIRECTORY_NAME.to_string(), url: directory_url(city), kind: "directory".to_string() }
}

//! Content hashing for drift detection.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of already-normalized page content.
///
/// Callers normalize first so per-request noise does not change the hash.
pub fn content_hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when both hashes exist and differ.
pub fn has_drifted(previous: Option<&str>, current: Option<&str>) -> bool {
    matches!((previous, current), (Some(p), Some(c)) if p != c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = content_hash("<h1>Pizza boxes</h1> compost if greasy");
        let hash2 = content_hash("<h1>Pizza boxes</h1> compost if greasy");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_content() {
        assert_ne!(content_hash("compost if greasy"), content_hash("trash if greasy"));
    }

    #[test]
    fn test_hash_format() {
        let hash = content_hash("");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_drift_requires_previous_hash() {
        assert!(!has_drifted(None, Some("abc")));
        assert!(!has_drifted(Some("abc"), None));
        assert!(!has_drifted(Some("abc"), Some("abc")));
        assert!(has_drifted(Some("abc"), Some("def")));
    }
}

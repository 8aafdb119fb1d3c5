//! Persistence seam used by the verifier.
//!
//! Reads degrade to "nothing cached" on database errors so a broken cache
//! never blocks a lookup. Writes report their error and let the caller
//! decide.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::connection::CacheDb;
use super::sources::SourceRecord;
use crate::Error;
use crate::model::CachedSource;

#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Cached record for the key, or None on a miss or read failure.
    async fn read(&self, location: &str, item_pattern: &str, now: DateTime<Utc>) -> Option<CachedSource>;

    /// Persist a validation pass and return the record id.
    async fn write(&self, record: &SourceRecord, now: DateTime<Utc>) -> Result<i64, Error>;

    /// Whether the location sits inside a legislative volatility window.
    async fn is_volatile(&self, location: &str, as_of: DateTime<Utc>) -> bool;

    /// Last known content hash for a URL.
    async fn last_content_hash(&self, url: &str) -> Option<String>;
}

#[async_trait]
impl SourceStore for CacheDb {
    async fn read(&self, location: &str, item_pattern: &str, now: DateTime<Utc>) -> Option<CachedSource> {
        match self.get_cached_sources(location, item_pattern, now).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, location, item_pattern, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write(&self, record: &SourceRecord, now: DateTime<Utc>) -> Result<i64, Error> {
        self.save_sources(record, now).await
    }

    async fn is_volatile(&self, location: &str, as_of: DateTime<Utc>) -> bool {
        self.is_in_volatility_window(location, as_of).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, location, "volatility check failed");
            false
        })
    }

    async fn last_content_hash(&self, url: &str) -> Option<String> {
        match CacheDb::last_content_hash(self, url).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(error = %e, url, "content hash lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LegislativeEvent, SourceMetadata, SourceValidationResult};
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_store_through_trait_object() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store: Arc<dyn SourceStore> = Arc::new(db.clone());
        let now = DateTime::parse_from_rfc3339("2026-02-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let url = "https://recyclesmart.org/what-goes-where";

        assert!(store.read("Walnut Creek, CA", "styrofoam", now).await.is_none());

        let check = SourceValidationResult {
            http_status: Some(200),
            content_hash: Some("f".repeat(64)),
            ..SourceValidationResult::new(url, now)
        };
        let record = SourceRecord {
            location: "Walnut Creek, CA".into(),
            item_pattern: "styrofoam".into(),
            guidance_text: "Styrofoam goes in the trash.".into(),
            sources: vec![SourceMetadata::url_candidate(None, url)],
            validations: vec![check],
        };
        store.write(&record, now).await.unwrap();

        let cached = store.read("walnut creek, ca", "styrofoam", now).await.unwrap();
        assert!(cached.sources[0].verified);
        assert_eq!(store.last_content_hash(url).await, Some("f".repeat(64)));
        assert!(!store.is_volatile("Walnut Creek, CA", now).await);

        db.add_legislative_event(&LegislativeEvent {
            region: "ca".into(),
            deadline_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            description: None,
        })
        .await
        .unwrap();
        assert!(store.is_volatile("Walnut Creek, CA", now).await);
    }

    #[tokio::test]
    async fn test_corrupt_row_reads_as_miss() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store: Arc<dyn SourceStore> = Arc::new(db.clone());
        let now = DateTime::parse_from_rfc3339("2026-02-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let url = "https://recyclesmart.org/what-goes-where";
        let record = SourceRecord {
            location: "Walnut Creek, CA".into(),
            item_pattern: "styrofoam".into(),
            guidance_text: String::new(),
            sources: vec![SourceMetadata::url_candidate(None, url)],
            validations: vec![SourceValidationResult { http_status: Some(200), ..SourceValidationResult::new(url, now) }],
        };
        store.write(&record, now).await.unwrap();

        db.conn
            .call(|conn| conn.execute("UPDATE municipal_sources SET next_check_date = 'garbage'", []))
            .await
            .unwrap();

        assert!(db.get_cached_sources("Walnut Creek, CA", "styrofoam", now).await.is_err());
        assert!(store.read("Walnut Creek, CA", "styrofoam", now).await.is_none());
    }

    #[tokio::test]
    async fn test_volatility_query_failure_is_not_volatile() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store: Arc<dyn SourceStore> = Arc::new(db.clone());
        let now = DateTime::parse_from_rfc3339("2026-02-01T00:00:00Z").unwrap().with_timezone(&Utc);

        db.conn.call(|conn| conn.execute_batch("DROP TABLE legislative_events")).await.unwrap();

        assert!(db.is_in_volatility_window("Walnut Creek, CA", now).await.is_err());
        assert!(!store.is_volatile("Walnut Creek, CA", now).await);
    }
}

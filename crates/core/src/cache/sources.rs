//! Cached source records.
//!
//! One row per lower-cased `(location, item_pattern)`. The citation list is
//! flattened into a primary URL, a phone number and a facility name, and
//! rebuilt on read.

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::stability_log::{count_consecutive_failures, insert_log_entry};
use crate::Error;
use crate::model::{CachedSource, SourceKind, SourceMetadata, SourceType, SourceValidationResult, Stability};
use crate::stability::{classify_source_type, classify_stability, next_check_date};

/// Everything persisted by one validation pass for a key.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub location: String,
    pub item_pattern: String,
    pub guidance_text: String,
    pub sources: Vec<SourceMetadata>,
    /// One entry per probed URL; each becomes a stability log row.
    pub validations: Vec<SourceValidationResult>,
}

impl SourceRecord {
    /// First verified URL, else the first URL at all.
    pub fn primary_url(&self) -> Option<&SourceMetadata> {
        self.sources
            .iter()
            .find(|s| s.is_url() && s.verified)
            .or_else(|| self.sources.iter().find(|s| s.is_url()))
    }

    pub fn validation_for(&self, url: &str) -> Option<&SourceValidationResult> {
        self.validations.iter().rev().find(|v| v.url == url)
    }

    fn first_of(&self, kind: SourceKind) -> Option<String> {
        self.sources.iter().find(|s| s.kind == kind).map(|s| s.value.clone())
    }
}

/// Lookup keys are trimmed and lower-cased.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Fixed-width UTC timestamp so stored values sort lexicographically.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptRow(format!("bad timestamp {raw:?}: {e}")))
}

const SELECT_COLUMNS: &str = "SELECT
    id, location, item_pattern, guidance_text, source_type,
    source_url, source_name, source_phone, source_facility_name,
    http_status, soft_404_detected, parked_domain_detected, content_hash,
    last_verified_at, next_check_date, updated_at
FROM municipal_sources";

/// Raw column values, decoded outside the database thread.
struct SourceRow {
    id: i64,
    location: String,
    item_pattern: String,
    guidance_text: String,
    source_type: Option<String>,
    source_url: Option<String>,
    source_name: Option<String>,
    source_phone: Option<String>,
    source_facility_name: Option<String>,
    http_status: Option<u16>,
    soft_404_detected: bool,
    parked_domain_detected: bool,
    content_hash: Option<String>,
    last_verified_at: Option<String>,
    next_check_date: String,
    updated_at: String,
}

impl SourceRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            location: row.get(1)?,
            item_pattern: row.get(2)?,
            guidance_text: row.get(3)?,
            source_type: row.get(4)?,
            source_url: row.get(5)?,
            source_name: row.get(6)?,
            source_phone: row.get(7)?,
            source_facility_name: row.get(8)?,
            http_status: row.get(9)?,
            soft_404_detected: row.get(10)?,
            parked_domain_detected: row.get(11)?,
            content_hash: row.get(12)?,
            last_verified_at: row.get(13)?,
            next_check_date: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }

    fn into_cached(self, now: DateTime<Utc>) -> Result<CachedSource, Error> {
        let last_verified_at = self.last_verified_at.as_deref().map(parse_ts).transpose()?;
        let updated_at = parse_ts(&self.updated_at)?;
        let next_check_date = parse_ts(&self.next_check_date)?;
        let checked_ok = self.http_status == Some(200) && !self.soft_404_detected && !self.parked_domain_detected;

        let mut sources = Vec::new();
        if let Some(url) = self.source_url {
            let verified_at = if checked_ok { last_verified_at } else { None };
            sources.push(SourceMetadata {
                kind: SourceKind::Url,
                stability: classify_stability(&url),
                value: url,
                name: self.source_name,
                verified: verified_at.is_some(),
                verified_at,
            });
        }
        let vouched_at = last_verified_at.unwrap_or(updated_at);
        if let Some(phone) = self.source_phone {
            sources.push(SourceMetadata::phone(phone, vouched_at));
        }
        if let Some(facility) = self.source_facility_name {
            sources.push(SourceMetadata::facility(facility, vouched_at));
        }

        let source_type = self
            .source_type
            .as_deref()
            .map(str::parse::<SourceType>)
            .transpose()
            .map_err(Error::CorruptRow)?;

        Ok(CachedSource {
            id: self.id,
            location: self.location,
            item_pattern: self.item_pattern,
            guidance_text: self.guidance_text,
            sources,
            source_type,
            content_hash: self.content_hash,
            last_verified_at,
            next_check_date,
            needs_validation: next_check_date <= now,
        })
    }
}

impl CacheDb {
    /// Look up the cached record for a location and item.
    ///
    /// Returns None if no record exists for the lower-cased key.
    pub async fn get_cached_sources(
        &self, location: &str, item_pattern: &str, now: DateTime<Utc>,
    ) -> Result<Option<CachedSource>, Error> {
        let location = normalize_key(location);
        let item_pattern = normalize_key(item_pattern);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<SourceRow>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE location = ?1 AND item_pattern = ?2"))?;
                let result = stmt.query_row(params![location, item_pattern], SourceRow::from_row);

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(|r| r.into_cached(now)).transpose()
    }

    /// Insert or update the record for a key and append its probe log.
    ///
    /// Runs in one transaction. The recheck date follows the primary URL's
    /// stability class, shortened when that URL keeps failing. Concurrent
    /// writers for the same key resolve last-writer-wins.
    ///
    /// Returns the row id.
    pub async fn save_sources(&self, record: &SourceRecord, now: DateTime<Utc>) -> Result<i64, Error> {
        let location = normalize_key(&record.location);
        let item_pattern = normalize_key(&record.item_pattern);
        if location.is_empty() || item_pattern.is_empty() {
            return Err(Error::InvalidInput("location and item_pattern are required".into()));
        }

        let primary = record.primary_url().cloned();
        let primary_check = primary
            .as_ref()
            .and_then(|p| record.validation_for(&p.value))
            .cloned();
        let source_type = primary
            .as_ref()
            .and_then(|p| classify_source_type(&p.value))
            .map(|t| t.as_str());
        let stability = primary.as_ref().map(|p| p.stability).unwrap_or(Stability::Medium);
        let phone = record.first_of(SourceKind::Phone);
        let facility = record.first_of(SourceKind::Facility);
        let guidance_text = record.guidance_text.clone();
        let validations = record.validations.clone();

        // Valid primary: its check time. Otherwise keep the stored value.
        let last_verified_at = match (&primary, &primary_check) {
            (Some(_), Some(check)) if check.is_valid() => Some(format_ts(check.checked_at)),
            (Some(p), None) if p.verified => p.verified_at.map(format_ts),
            _ => None,
        };
        let now_str = format_ts(now);

        self.conn
            .call(move |conn| -> Result<i64, Error> {
                let tx = conn.transaction()?;

                let recent_failures = match &primary_check {
                    Some(check) if !check.is_valid() => 1 + count_consecutive_failures(&tx, &check.url)?,
                    _ => 0,
                };
                let next_check = format_ts(next_check_date(stability, recent_failures, now));

                tx.execute(
                    "INSERT INTO municipal_sources (
                        location, item_pattern, guidance_text, source_type,
                        source_url, source_name, source_phone, source_facility_name,
                        http_status, soft_404_detected, parked_domain_detected, content_hash,
                        last_verified_at, next_check_date, verification_error, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
                    ON CONFLICT(location, item_pattern) DO UPDATE SET
                        guidance_text = excluded.guidance_text,
                        source_type = excluded.source_type,
                        source_url = excluded.source_url,
                        source_name = excluded.source_name,
                        source_phone = excluded.source_phone,
                        source_facility_name = excluded.source_facility_name,
                        http_status = excluded.http_status,
                        soft_404_detected = excluded.soft_404_detected,
                        parked_domain_detected = excluded.parked_domain_detected,
                        content_hash = excluded.content_hash,
                        last_verified_at = COALESCE(excluded.last_verified_at, municipal_sources.last_verified_at),
                        next_check_date = excluded.next_check_date,
                        verification_error = excluded.verification_error,
                        updated_at = excluded.updated_at",
                    params![
                        location,
                        item_pattern,
                        guidance_text,
                        source_type,
                        primary.as_ref().map(|p| p.value.clone()),
                        primary.as_ref().and_then(|p| p.name.clone()),
                        phone,
                        facility,
                        primary_check.as_ref().and_then(|c| c.http_status),
                        primary_check.as_ref().is_some_and(|c| c.is_soft_404),
                        primary_check.as_ref().is_some_and(|c| c.is_parked_domain),
                        primary_check.as_ref().and_then(|c| c.content_hash.clone()),
                        last_verified_at,
                        next_check,
                        primary_check.as_ref().and_then(|c| c.error_message.clone()),
                        now_str,
                    ],
                )?;

                let source_id: i64 = tx.query_row(
                    "SELECT id FROM municipal_sources WHERE location = ?1 AND item_pattern = ?2",
                    params![location, item_pattern],
                    |row| row.get(0),
                )?;

                for check in &validations {
                    insert_log_entry(&tx, source_id, check)?;
                }

                tx.commit()?;
                tracing::debug!(
                    source_id,
                    %location,
                    %item_pattern,
                    recent_failures,
                    %next_check,
                    logged = validations.len(),
                    "saved sources"
                );
                Ok(source_id)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether no record exists yet for any item at this location.
    pub async fn is_first_lookup_for_location(&self, location: &str) -> Result<bool, Error> {
        let location = normalize_key(location);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM municipal_sources WHERE location = ?1)",
                    params![location],
                    |row| row.get(0),
                )?;
                Ok(!exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Records whose recheck date has passed, oldest first.
    pub async fn sources_due_for_check(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<CachedSource>, Error> {
        let now_str = format_ts(now);
        let limit = limit as i64;
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<SourceRow>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE next_check_date <= ?1 ORDER BY next_check_date ASC LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(params![now_str, limit], SourceRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(|r| r.into_cached(now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn check(url: &str, status: Option<u16>, at: DateTime<Utc>) -> SourceValidationResult {
        SourceValidationResult {
            http_status: status,
            content_hash: status.map(|_| "a".repeat(64)),
            error_message: if status == Some(200) { None } else { Some("HTTP 404: Resource not found".into()) },
            ..SourceValidationResult::new(url, at)
        }
    }

    fn record(url: &str, result: SourceValidationResult) -> SourceRecord {
        let mut source = SourceMetadata::url_candidate(Some("Guide".into()), url);
        source.verified = result.is_valid();
        source.verified_at = result.is_valid().then_some(result.checked_at);
        SourceRecord {
            location: "Oakland, CA".into(),
            item_pattern: "Pizza Box".into(),
            guidance_text: "Compost greasy pizza boxes.".into(),
            sources: vec![source],
            validations: vec![result],
        }
    }

    async fn log_count(db: &CacheDb) -> i64 {
        db.conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM source_stability_log", [], |row| row.get(0)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_read_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = ts("2026-03-01T12:00:00Z");
        let url = "https://www.stopwaste.org/recycling-guide";

        let id = db.save_sources(&record(url, check(url, Some(200), now)), now).await.unwrap();

        let cached = db.get_cached_sources("oakland, ca", "pizza box", now).await.unwrap().unwrap();
        assert_eq!(cached.id, id);
        assert_eq!(cached.location, "oakland, ca");
        assert_eq!(cached.item_pattern, "pizza box");
        assert_eq!(cached.source_type, Some(SourceType::Jpa));
        assert_eq!(cached.next_check_date - now, Duration::days(90));
        assert!(!cached.needs_validation);
        assert_eq!(cached.sources.len(), 1);
        assert!(cached.sources[0].verified);
        assert_eq!(cached.sources[0].verified_at, Some(now));
        assert_eq!(cached.sources[0].name.as_deref(), Some("Guide"));
        assert_eq!(cached.sources[0].stability, Stability::High);
    }

    #[tokio::test]
    async fn test_read_lowercases_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let url = "https://www.oakland.gov/recycling";
        db.save_sources(&record(url, check(url, Some(200), now)), now).await.unwrap();

        assert!(db.get_cached_sources("  OAKLAND, CA ", "PIZZA BOX", now).await.unwrap().is_some());
        assert!(db.get_cached_sources("berkeley, ca", "pizza box", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = ts("2026-03-01T12:00:00Z");
        let url = "https://www.oakland.gov/recycling";

        let first = db.save_sources(&record(url, check(url, Some(200), now)), now).await.unwrap();
        let later = now + Duration::days(100);
        let mut second_record = record(url, check(url, Some(200), later));
        second_record.guidance_text = "Updated guidance.".into();
        let second = db.save_sources(&second_record, later).await.unwrap();

        assert_eq!(first, second);
        let rows: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM municipal_sources", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(log_count(&db).await, 2);

        let cached = db.get_cached_sources("oakland, ca", "pizza box", later).await.unwrap().unwrap();
        assert_eq!(cached.guidance_text, "Updated guidance.");
        assert_eq!(cached.last_verified_at, Some(later));
    }

    #[tokio::test]
    async fn test_needs_validation_after_next_check_date() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = ts("2026-03-01T12:00:00Z");
        let url = "https://springfieldrecycles.com/rules";
        db.save_sources(&record(url, check(url, Some(200), now)), now).await.unwrap();

        let before = db.get_cached_sources("oakland, ca", "pizza box", now + Duration::days(13)).await.unwrap().unwrap();
        assert!(!before.needs_validation);

        let at = db.get_cached_sources("oakland, ca", "pizza box", now + Duration::days(14)).await.unwrap().unwrap();
        assert!(at.needs_validation);
    }

    #[tokio::test]
    async fn test_failures_shorten_recheck() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://www.oakland.gov/recycling";
        let mut now = ts("2026-03-01T12:00:00Z");

        db.save_sources(&record(url, check(url, None, now)), now).await.unwrap();
        let cached = db.get_cached_sources("oakland, ca", "pizza box", now).await.unwrap().unwrap();
        assert_eq!(cached.next_check_date - now, Duration::days(45));
        assert!(!cached.sources[0].verified);
        assert!(cached.sources[0].verified_at.is_none());

        now += Duration::days(45);
        db.save_sources(&record(url, check(url, Some(404), now)), now).await.unwrap();
        let cached = db.get_cached_sources("oakland, ca", "pizza box", now).await.unwrap().unwrap();
        assert_eq!(cached.next_check_date - now, Duration::days(30));

        now += Duration::days(30);
        db.save_sources(&record(url, check(url, Some(200), now)), now).await.unwrap();
        let cached = db.get_cached_sources("oakland, ca", "pizza box", now).await.unwrap().unwrap();
        assert_eq!(cached.next_check_date - now, Duration::days(90));
    }

    #[tokio::test]
    async fn test_failed_primary_keeps_last_verified_at() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://www.oakland.gov/recycling";
        let first = ts("2026-03-01T12:00:00Z");
        db.save_sources(&record(url, check(url, Some(200), first)), first).await.unwrap();

        let later = first + Duration::days(91);
        db.save_sources(&record(url, check(url, Some(500), later)), later).await.unwrap();

        let cached = db.get_cached_sources("oakland, ca", "pizza box", later).await.unwrap().unwrap();
        assert_eq!(cached.last_verified_at, Some(first));
        assert!(!cached.sources[0].verified);
    }

    #[tokio::test]
    async fn test_phone_and_facility_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = ts("2026-03-01T12:00:00Z");
        let record = SourceRecord {
            location: "Springfield".into(),
            item_pattern: "batteries".into(),
            guidance_text: "Take batteries to the HHW facility.".into(),
            sources: vec![
                SourceMetadata::phone("2175551234", now),
                SourceMetadata::facility("Springfield Household Hazardous Waste", now),
            ],
            validations: vec![],
        };
        db.save_sources(&record, now).await.unwrap();

        let cached = db.get_cached_sources("springfield", "batteries", now).await.unwrap().unwrap();
        assert_eq!(cached.sources.len(), 2);
        assert!(cached.sources.iter().all(|s| s.verified && s.verified_at.is_some()));
        assert_eq!(cached.source_type, None);
        assert_eq!(cached.last_verified_at, None);
        assert_eq!(cached.next_check_date - now, Duration::days(30));
        assert_eq!(log_count(&db).await, 0);
    }

    #[test]
    fn test_primary_prefers_verified_url() {
        let now = Utc::now();
        let mut dead = SourceMetadata::url_candidate(None, "https://dead.example/rules");
        dead.verified = false;
        let mut live = SourceMetadata::url_candidate(None, "https://www.wm.com/recycle");
        live.verified = true;
        live.verified_at = Some(now);

        let record = SourceRecord {
            location: "x".into(),
            item_pattern: "y".into(),
            guidance_text: String::new(),
            sources: vec![dead, live],
            validations: vec![],
        };
        assert_eq!(record.primary_url().unwrap().value, "https://www.wm.com/recycle");
    }

    #[tokio::test]
    async fn test_save_rejects_empty_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        let mut rec = record("https://www.oakland.gov/", check("https://www.oakland.gov/", Some(200), now));
        rec.location = "   ".into();
        assert!(matches!(db.save_sources(&rec, now).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_first_lookup_for_location() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        assert!(db.is_first_lookup_for_location("Oakland, CA").await.unwrap());

        let url = "https://www.oakland.gov/recycling";
        db.save_sources(&record(url, check(url, Some(200), now)), now).await.unwrap();
        assert!(!db.is_first_lookup_for_location("OAKLAND, CA").await.unwrap());
    }

    #[tokio::test]
    async fn test_sources_due_for_check() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = ts("2026-03-01T12:00:00Z");
        let url = "https://springfieldrecycles.com/rules";
        db.save_sources(&record(url, check(url, Some(200), now)), now).await.unwrap();

        assert!(db.sources_due_for_check(now, 10).await.unwrap().is_empty());
        let due = db.sources_due_for_check(now + Duration::days(15), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert!(due[0].needs_validation);
    }
}

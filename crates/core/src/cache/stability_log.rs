//! Append-only probe history.

use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::sources::{format_ts, parse_ts};
use crate::Error;
use crate::model::{SourceValidationResult, StabilityLogEntry};

/// Consecutive failures are only counted this far back.
const FAILURE_LOOKBACK: i64 = 64;

pub(crate) fn insert_log_entry(
    conn: &rusqlite::Connection, source_id: i64, check: &SourceValidationResult,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO source_stability_log (
            source_id, url, checked_at, http_status, soft_404_detected,
            parked_domain_detected, content_hash, content_changed, error_message
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            source_id,
            check.url,
            format_ts(check.checked_at),
            check.http_status,
            check.is_soft_404,
            check.is_parked_domain,
            check.content_hash,
            check.content_changed,
            check.error_message,
        ],
    )?;
    Ok(())
}

/// Failed checks for `url` since its most recent success.
pub(crate) fn count_consecutive_failures(conn: &rusqlite::Connection, url: &str) -> rusqlite::Result<u32> {
    let mut stmt = conn.prepare(
        "SELECT http_status, soft_404_detected, parked_domain_detected
         FROM source_stability_log
         WHERE url = ?1
         ORDER BY checked_at DESC, id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![url, FAILURE_LOOKBACK], |row| {
        let status: Option<u16> = row.get(0)?;
        let soft_404: bool = row.get(1)?;
        let parked: bool = row.get(2)?;
        Ok(status != Some(200) || soft_404 || parked)
    })?;

    let mut failures = 0;
    for failed in rows {
        if !failed? {
            break;
        }
        failures += 1;
    }
    Ok(failures)
}

struct LogRow {
    id: i64,
    source_id: i64,
    url: String,
    checked_at: String,
    http_status: Option<u16>,
    soft_404_detected: bool,
    parked_domain_detected: bool,
    content_hash: Option<String>,
    content_changed: bool,
    error_message: Option<String>,
}

impl LogRow {
    fn into_entry(self) -> Result<StabilityLogEntry, Error> {
        Ok(StabilityLogEntry {
            id: self.id,
            source_id: self.source_id,
            url: self.url,
            checked_at: parse_ts(&self.checked_at)?,
            http_status: self.http_status,
            soft_404_detected: self.soft_404_detected,
            parked_domain_detected: self.parked_domain_detected,
            content_hash: self.content_hash,
            content_changed: self.content_changed,
            error_message: self.error_message,
        })
    }
}

impl CacheDb {
    /// Probe history for a cached record, newest first.
    pub async fn stability_log(&self, source_id: i64, limit: usize) -> Result<Vec<StabilityLogEntry>, Error> {
        let limit = limit as i64;
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<LogRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, source_id, url, checked_at, http_status, soft_404_detected,
                            parked_domain_detected, content_hash, content_changed, error_message
                     FROM source_stability_log
                     WHERE source_id = ?1
                     ORDER BY checked_at DESC, id DESC
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![source_id, limit], |row| {
                        Ok(LogRow {
                            id: row.get(0)?,
                            source_id: row.get(1)?,
                            url: row.get(2)?,
                            checked_at: row.get(3)?,
                            http_status: row.get(4)?,
                            soft_404_detected: row.get(5)?,
                            parked_domain_detected: row.get(6)?,
                            content_hash: row.get(7)?,
                            content_changed: row.get(8)?,
                            error_message: row.get(9)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(LogRow::into_entry).collect()
    }

    /// Number of failed checks for `url` since its last success.
    pub async fn consecutive_failures(&self, url: &str) -> Result<u32, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<u32, Error> { Ok(count_consecutive_failures(conn, &url)?) })
            .await
            .map_err(Error::from)
    }

    /// Most recent non-null content hash recorded for `url`.
    pub async fn last_content_hash(&self, url: &str) -> Result<Option<String>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT content_hash FROM source_stability_log
                     WHERE url = ?1 AND content_hash IS NOT NULL
                     ORDER BY checked_at DESC, id DESC
                     LIMIT 1",
                    params![url],
                    |row| row.get(0),
                );

                match result {
                    Ok(hash) => Ok(Some(hash)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

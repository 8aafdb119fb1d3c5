//! Legislative deadlines and the volatility window around them.
//!
//! Rules tend to change right before and after a regulatory deadline, so a
//! location whose region has a deadline within [`VOLATILITY_WINDOW_DAYS`] is
//! always re-probed, whatever its recheck date says.

use chrono::{DateTime, Days, Utc};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use crate::Error;
use crate::model::LegislativeEvent;

/// Days on either side of a deadline, inclusive.
pub const VOLATILITY_WINDOW_DAYS: u64 = 60;

/// Region key for a free-form location: its trailing comma component,
/// lower-cased. `"Oakland, CA"` maps to `"ca"`.
pub fn region_for_location(location: &str) -> String {
    location.rsplit(',').next().unwrap_or_default().trim().to_lowercase()
}

impl CacheDb {
    /// Record a deadline. Regions are stored lower-cased.
    pub async fn add_legislative_event(&self, event: &LegislativeEvent) -> Result<i64, Error> {
        let region = event.region.trim().to_lowercase();
        if region.is_empty() {
            return Err(Error::InvalidInput("region cannot be empty".into()));
        }
        let deadline = event.deadline_date.format("%Y-%m-%d").to_string();
        let description = event.description.clone();

        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO legislative_events (region, deadline_date, description) VALUES (?1, ?2, ?3)",
                    params![region, deadline, description],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether any deadline for the location, or for its region, falls
    /// within the window around `as_of`.
    pub async fn is_in_volatility_window(&self, location: &str, as_of: DateTime<Utc>) -> Result<bool, Error> {
        let full = location.trim().to_lowercase();
        let region = region_for_location(location);
        let today = as_of.date_naive();
        let window = Days::new(VOLATILITY_WINDOW_DAYS);
        let (Some(from), Some(to)) = (today.checked_sub_days(window), today.checked_add_days(window)) else {
            return Ok(false);
        };
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let found: bool = conn.query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM legislative_events
                        WHERE region IN (?1, ?2) AND deadline_date BETWEEN ?3 AND ?4
                    )",
                    params![full, region, from, to],
                    |row| row.get(0),
                )?;
                Ok(found)
            })
            .await
            .map_err(Error::from)
    }
}

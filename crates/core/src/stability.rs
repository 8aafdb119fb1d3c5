//! Domain stability classification and recheck scheduling.
//!
//! Government and authority domains rarely restructure URLs or expire,
//! national haulers occasionally do, and small city microsites churn often.
//! Cache lifetimes follow the class of the issuing domain.

use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::model::{SourceType, Stability};

/// Joint-powers authorities and aggregators.
pub const HIGH_STABILITY_DOMAINS: &[&str] = &["recyclesmart.org", "stopwaste.org", "earth911.com", "data.cincinnati-oh.gov"];

/// Major national waste haulers.
pub const MEDIUM_STABILITY_DOMAINS: &[&str] = &["wm.com", "republicservices.com", "wasteconnections.com"];

/// Authority domains tagged `jpa` ahead of the generic `.gov` rule.
pub const AUTHORITY_DOMAINS: &[&str] = &["recyclesmart.org", "stopwaste.org"];

/// Hostname fragments that mark a hauler outside the allow-list.
const HAULER_HINTS: &[&str] = &["waste", "republic"];

/// Floor for the shortened interval of a failing source.
pub const MIN_RECHECK_DAYS: i64 = 7;

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() { None } else { Some(host) }
}

fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
}

fn in_list(host: &str, list: &[&str]) -> bool {
    list.iter().any(|domain| matches_domain(host, domain))
}

/// Classify a URL's domain into a stability class.
///
/// Allow-lists win over the `.gov` rule; anything unparseable is `Low`.
pub fn classify_stability(url: &str) -> Stability {
    let Some(host) = host_of(url) else {
        return Stability::Low;
    };

    if in_list(&host, HIGH_STABILITY_DOMAINS) {
        Stability::High
    } else if in_list(&host, MEDIUM_STABILITY_DOMAINS) {
        Stability::Medium
    } else if host.ends_with(".gov") {
        Stability::High
    } else {
        Stability::Low
    }
}

/// Tag the issuer of a URL for reporting.
pub fn classify_source_type(url: &str) -> Option<SourceType> {
    let host = host_of(url)?;

    let ty = if in_list(&host, AUTHORITY_DOMAINS) {
        SourceType::Jpa
    } else if host.ends_with(".gov") {
        SourceType::Gov
    } else if in_list(&host, MEDIUM_STABILITY_DOMAINS) || HAULER_HINTS.iter().any(|hint| host.contains(hint)) {
        SourceType::Hauler
    } else {
        SourceType::Microsite
    };
    Some(ty)
}

/// Base interval in days before a source must be rechecked.
pub fn base_interval_days(stability: Stability) -> i64 {
    match stability {
        Stability::High => 90,
        Stability::Medium => 30,
        Stability::Low => 14,
    }
}

/// Interval before the next check, shortened by recent consecutive failures.
pub fn recheck_interval(stability: Stability, recent_failures: u32) -> Duration {
    let base = base_interval_days(stability);
    let days = if recent_failures > 0 {
        (base / (i64::from(recent_failures) + 1)).max(MIN_RECHECK_DAYS)
    } else {
        base
    };
    Duration::days(days)
}

pub fn next_check_date(stability: Stability, recent_failures: u32, from: DateTime<Utc>) -> DateTime<Utc> {
    from + recheck_interval(stability, recent_failures)
}

//! Source data model.
//!
//! Citations flow through the subsystem as [`SourceMetadata`]; each probe of
//! a URL produces one [`SourceValidationResult`]; the durable record for a
//! `(location, item_pattern)` pair is a [`CachedSource`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::stability::classify_stability;

/// Kind of citation shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    Phone,
    Facility,
    /// Synthesized directory-search link, never probed.
    Directory,
}

/// Coarse estimate of how often a domain's content or URLs change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    High,
    Medium,
    Low,
}

impl Stability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stability::High => "high",
            Stability::Medium => "medium",
            Stability::Low => "low",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting tag for the issuer of the primary URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Joint-powers authority.
    Jpa,
    Gov,
    Hauler,
    Microsite,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Jpa => "jpa",
            SourceType::Gov => "gov",
            SourceType::Hauler => "hauler",
            SourceType::Microsite => "microsite",
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpa" => Ok(SourceType::Jpa),
            "gov" => Ok(SourceType::Gov),
            "hauler" => Ok(SourceType::Hauler),
            "microsite" => Ok(SourceType::Microsite),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

/// A single citation considered for display to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceMetadata {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// URL string, phone digits, or facility name.
    pub value: String,
    /// Display name, when the supplier gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    pub stability: Stability,
}

impl SourceMetadata {
    /// An unverified URL citation, classified by its domain.
    pub fn url_candidate(name: Option<String>, url: impl Into<String>) -> Self {
        let value = url.into();
        let stability = classify_stability(&value);
        Self { kind: SourceKind::Url, value, name, verified: false, verified_at: None, stability }
    }

    /// A phone citation. Phone numbers need no network check.
    pub fn phone(digits: impl Into<String>, verified_at: DateTime<Utc>) -> Self {
        Self {
            kind: SourceKind::Phone,
            value: digits.into(),
            name: None,
            verified: true,
            verified_at: Some(verified_at),
            stability: Stability::High,
        }
    }

    /// A facility citation. Facility names need no network check.
    pub fn facility(name: impl Into<String>, verified_at: DateTime<Utc>) -> Self {
        Self {
            kind: SourceKind::Facility,
            value: name.into(),
            name: None,
            verified: true,
            verified_at: Some(verified_at),
            stability: Stability::Medium,
        }
    }

    /// A directory-search link offered when no citation survived.
    pub fn directory(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Directory,
            value: url.into(),
            name: Some(name.into()),
            verified: false,
            verified_at: None,
            stability: Stability::High,
        }
    }

    pub fn is_url(&self) -> bool {
        self.kind == SourceKind::Url
    }
}

/// Outcome of probing exactly one URL at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceValidationResult {
    pub url: String,
    /// Absent when the request never produced a response.
    pub http_status: Option<u16>,
    pub is_soft_404: bool,
    pub is_parked_domain: bool,
    pub content_hash: Option<String>,
    /// Only set when a previous hash exists and differs.
    pub content_changed: bool,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl SourceValidationResult {
    /// An empty result, invalid until a status is recorded.
    pub fn new(url: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            http_status: None,
            is_soft_404: false,
            is_parked_domain: false,
            content_hash: None,
            content_changed: false,
            error_message: None,
            checked_at,
        }
    }

    /// A result for a request that failed before any status arrived.
    pub fn failed(url: impl Into<String>, checked_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self { error_message: Some(message.into()), ..Self::new(url, checked_at) }
    }

    pub fn is_valid(&self) -> bool {
        self.http_status == Some(200) && !self.is_soft_404 && !self.is_parked_domain
    }
}

/// Durable record keyed by `(location, item_pattern)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CachedSource {
    pub id: i64,
    pub location: String,
    pub item_pattern: String,
    pub guidance_text: String,
    pub sources: Vec<SourceMetadata>,
    pub source_type: Option<SourceType>,
    pub content_hash: Option<String>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub next_check_date: DateTime<Utc>,
    pub needs_validation: bool,
}

/// One append-only audit row per probe attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StabilityLogEntry {
    pub id: i64,
    pub source_id: i64,
    pub url: String,
    pub checked_at: DateTime<Utc>,
    pub http_status: Option<u16>,
    pub soft_404_detected: bool,
    pub parked_domain_detected: bool,
    pub content_hash: Option<String>,
    pub content_changed: bool,
    pub error_message: Option<String>,
}

impl StabilityLogEntry {
    pub fn is_failure(&self) -> bool {
        self.http_status != Some(200) || self.soft_404_detected || self.parked_domain_detected
    }
}

/// Externally maintained regulatory deadline for a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LegislativeEvent {
    pub region: String,
    pub deadline_date: NaiveDate,
    pub description: Option<String>,
}

/// Citation shape used by the location-rules endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleSource {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

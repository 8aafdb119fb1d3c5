//! Core types and shared functionality for srcwatch.
//!
//! This crate provides:
//! - Source data model (citations, validation results, cached rows)
//! - Domain stability classification and recheck intervals
//! - Source cache implementation with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod stability;

pub use cache::{CacheDb, SourceRecord, SourceStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use extract::{ExtractedSources, extract_sources};
pub use model::{
    CachedSource, LegislativeEvent, RuleSource, SourceKind, SourceMetadata, SourceType, SourceValidationResult,
    Stability, StabilityLogEntry,
};
pub use stability::{classify_source_type, classify_stability, next_check_date, recheck_interval};

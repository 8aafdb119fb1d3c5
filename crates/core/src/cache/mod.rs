//! SQLite-backed source cache.
//!
//! This module provides the persistence boundary for validated citations
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Keyed lookup and atomic upsert of `(location, item_pattern)` records
//! - An append-only stability log of every probe
//! - Legislative deadlines for volatility-window checks
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod legislative;
pub mod migrations;
pub mod sources;
pub mod stability_log;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use legislative::region_for_location;
pub use sources::SourceRecord;
pub use store::SourceStore;

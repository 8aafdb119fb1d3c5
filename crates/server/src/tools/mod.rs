//! MCP tool implementations.
//!
//! This module contains all tools exposed by the srcwatch server.

pub mod location_sources;
pub mod source_history;
pub mod sources_validate;

pub use location_sources::{LocationSourcesParams, location_sources_impl};
pub use source_history::{SourceHistoryParams, history_impl};
pub use sources_validate::{SourcesValidateParams, validate_impl};

//! Network side of srcwatch.
//!
//! This crate provides the URL prober, the content analyzer that inspects
//! probed pages, and the orchestrator that combines them with the source
//! cache from `srcwatch-core`.

pub mod analyze;
pub mod fetch;
pub mod verify;

pub use analyze::{ContentAnalysis, analyze, extract_title};
pub use fetch::{HttpProber, Probe, ProbeConfig, UrlError, canonicalize};
pub use verify::{SourceRequest, SourceVerifier, directory_fallback, rule_source_fallback};

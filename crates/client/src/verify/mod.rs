//! Source cache orchestration.
//!
//! [`SourceVerifier`] is the entry point request handlers call. It answers
//! from the cache when the cached record is fresh and its region is outside
//! any legislative volatility window; otherwise it probes every URL
//! citation concurrently, persists the outcome and returns only what
//! survived, adding a directory-search link when nothing did.

pub mod fallback;

use chrono::{DateTime, Utc};
use srcwatch_core::{
    Error, RuleSource, SourceKind, SourceMetadata, SourceRecord, SourceStore, SourceValidationResult,
    classify_stability,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::fetch::{Probe, canonicalize};

pub use fallback::{DIRECTORY_NAME, directory_fallback, directory_url, rule_source_fallback};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY: usize = 16;

/// One lookup: where, what, and the citations suggested for it.
#[derive(Debug, Clone, Default)]
pub struct SourceRequest {
    pub location: String,
    pub item_pattern: String,
    /// Guidance shown alongside the citations; persisted with them.
    pub guidance_text: String,
    pub candidates: Vec<SourceMetadata>,
}

impl SourceRequest {
    pub fn new(location: impl Into<String>, item_pattern: impl Into<String>) -> Self {
        Self { location: location.into(), item_pattern: item_pattern.into(), ..Self::default() }
    }

    pub fn with_guidance(mut self, text: impl Into<String>) -> Self {
        self.guidance_text = text.into();
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<SourceMetadata>) -> Self {
        self.candidates = candidates;
        self
    }
}

/// Validates citations and keeps the cache current.
pub struct SourceVerifier {
    probe: Arc<dyn Probe>,
    store: Arc<dyn SourceStore>,
    max_concurrency: usize,
}

impl SourceVerifier {
    pub fn new(probe: Arc<dyn Probe>, store: Arc<dyn SourceStore>) -> Self {
        Self { probe, store, max_concurrency: DEFAULT_MAX_CONCURRENCY }
    }

    /// Bound on probes in flight per request, clamped to 1..=16.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Validated citations for a location and item.
    ///
    /// Only malformed input is an error. Probe and persistence failures are
    /// absorbed: failed URLs are dropped and the directory fallback fills in.
    pub async fn get_validated_sources(&self, request: &SourceRequest) -> Result<Vec<SourceMetadata>, Error> {
        self.get_validated_sources_at(request, Utc::now()).await
    }

    /// [`Self::get_validated_sources`] with an explicit clock.
    pub async fn get_validated_sources_at(
        &self, request: &SourceRequest, now: DateTime<Utc>,
    ) -> Result<Vec<SourceMetadata>, Error> {
        let candidates = normalize_request(request)?;
        let location = request.location.trim();
        let item_pattern = request.item_pattern.trim();

        let cached = self.store.read(location, item_pattern, now).await;
        if let Some(hit) = &cached
            && !hit.needs_validation
        {
            if self.store.is_volatile(location, now).await {
                tracing::debug!(location, item_pattern, "inside volatility window, revalidating");
            } else {
                tracing::debug!(id = hit.id, location, item_pattern, "fresh cache hit");
                return Ok(present(hit.sources.clone(), location));
            }
        }

        let cached_sources = cached.as_ref().map(|c| c.sources.as_slice()).unwrap_or_default();
        let mut sources = merge(candidates, cached_sources);

        let urls: Vec<String> = sources.iter().filter(|s| s.is_url()).map(|s| s.value.clone()).collect();
        if urls.is_empty() && cached.is_none() {
            tracing::debug!(location, item_pattern, "no URL citations to validate, not caching");
            return Ok(present(sources, location));
        }

        let results = self.probe_all(urls, true).await;

        for (source, result) in sources.iter_mut().filter(|s| s.is_url()).zip(&results) {
            source.verified = result.is_valid();
            source.verified_at = source.verified.then_some(result.checked_at);
        }

        let guidance_text = match (&cached, request.guidance_text.trim().is_empty()) {
            (Some(c), true) => c.guidance_text.clone(),
            _ => request.guidance_text.clone(),
        };
        let record = SourceRecord {
            location: location.to_string(),
            item_pattern: item_pattern.to_string(),
            guidance_text,
            sources: sources.clone(),
            validations: results,
        };
        match self.store.write(&record, now).await {
            Ok(id) => tracing::debug!(id, location, item_pattern, "persisted validated sources"),
            Err(e) => tracing::warn!(error = %e, location, item_pattern, "failed to persist validated sources"),
        }

        Ok(present(sources, location))
    }

    /// Filter location-rules citations down to live ones.
    ///
    /// Bypasses the cache. Malformed URLs are dropped; when nothing survives
    /// the directory fallback for `city` is returned instead.
    pub async fn validate_rule_sources(&self, city: &str, sources: Vec<RuleSource>) -> Vec<RuleSource> {
        let mut accepted = Vec::with_capacity(sources.len());
        let mut urls = Vec::with_capacity(sources.len());
        for source in sources {
            match canonicalize(&source.url) {
                Ok(url) => {
                    urls.push(url.to_string());
                    accepted.push(source);
                }
                Err(e) => tracing::debug!(url = %source.url, error = %e, "dropping malformed rule source"),
            }
        }

        let results = self.probe_all(urls, false).await;
        let valid: Vec<RuleSource> = accepted
            .into_iter()
            .zip(&results)
            .filter(|(_, result)| result.is_valid())
            .map(|(source, _)| source)
            .collect();

        if valid.is_empty() {
            tracing::debug!(city, "no rule source survived, using directory fallback");
            return vec![rule_source_fallback(city)];
        }
        valid
    }

    /// Probe every URL with bounded concurrency. Results keep input order.
    async fn probe_all(&self, urls: Vec<String>, with_history: bool) -> Vec<SourceValidationResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();

        for (idx, url) in urls.iter().cloned().enumerate() {
            let probe = Arc::clone(&self.probe);
            let store = with_history.then(|| Arc::clone(&self.store));
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                // permit is released when the probe finishes
                let _permit = semaphore.acquire_owned().await;
                let previous = match &store {
                    Some(store) => store.last_content_hash(&url).await,
                    None => None,
                };
                (idx, probe.probe(&url, previous.as_deref()).await)
            });
        }

        let mut results: Vec<Option<SourceValidationResult>> = vec![None; urls.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, result)) => results[idx] = Some(result),
                Err(e) => tracing::warn!(error = %e, "probe task failed"),
            }
        }

        urls.into_iter()
            .zip(results)
            .map(|(url, result)| {
                result.unwrap_or_else(|| SourceValidationResult::failed(url, Utc::now(), "Probe task failed"))
            })
            .collect()
    }
}

/// Reject empty keys and unparseable URL candidates; canonicalize the rest.
fn normalize_request(request: &SourceRequest) -> Result<Vec<SourceMetadata>, Error> {
    if request.location.trim().is_empty() {
        return Err(Error::InvalidInput("location cannot be empty".into()));
    }
    if request.item_pattern.trim().is_empty() {
        return Err(Error::InvalidInput("item_pattern cannot be empty".into()));
    }

    request
        .candidates
        .iter()
        .map(|candidate| {
            if !candidate.is_url() {
                return Ok(candidate.clone());
            }
            let url = canonicalize(&candidate.value).map_err(|e| Error::InvalidUrl(format!("{}: {e}", candidate.value)))?;
            Ok(SourceMetadata {
                stability: classify_stability(url.as_str()),
                value: url.into(),
                verified: false,
                verified_at: None,
                ..candidate.clone()
            })
        })
        .collect()
}

/// Candidates first, then cached sources not already present.
fn merge(candidates: Vec<SourceMetadata>, cached: &[SourceMetadata]) -> Vec<SourceMetadata> {
    let mut merged: Vec<SourceMetadata> = Vec::with_capacity(candidates.len() + cached.len());
    for source in candidates.into_iter().chain(cached.iter().cloned()) {
        if !merged.iter().any(|m| m.kind == source.kind && m.value == source.value) {
            merged.push(source);
        }
    }
    merged
}

/// Drop unverified URLs and add the directory fallback when no URL is left.
fn present(sources: Vec<SourceMetadata>, location: &str) -> Vec<SourceMetadata> {
    let had_urls = sources.iter().any(SourceMetadata::is_url);
    let mut shown: Vec<SourceMetadata> = sources.into_iter().filter(|s| !s.is_url() || s.verified).collect();

    let url_survived = shown.iter().any(SourceMetadata::is_url);
    let has_directory = shown.iter().any(|s| s.kind == SourceKind::Directory);
    if !url_survived && !has_directory && (had_urls || shown.is_empty()) {
        shown.push(directory_fallback(location));
    }
    shown
}

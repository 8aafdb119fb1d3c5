//! sources_validate tool implementation.
//!
//! Validates the citations for one location and item, answering from the
//! source cache while it is fresh.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use srcwatch_client::{SourceRequest, SourceVerifier};
use srcwatch_core::{Error, SourceMetadata, extract_sources};

/// A citation suggested by the classifier or a search API.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CandidateSource {
    /// Display name for the citation.
    #[serde(default)]
    pub name: Option<String>,
    /// Citation URL.
    pub url: String,
}

/// Input parameters for sources_validate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SourcesValidateParams {
    /// Free-form location, e.g. "Oakland, CA".
    pub location: String,

    /// Item being sorted, e.g. "pizza box".
    pub item_pattern: String,

    /// Disposal guidance. Inline URLs, phone numbers and facility names are
    /// pulled out as additional citations.
    #[serde(default)]
    pub guidance_text: Option<String>,

    /// Suggested citation URLs.
    #[serde(default)]
    pub candidates: Vec<CandidateSource>,
}

/// Output structure for sources_validate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourcesValidateOutput {
    pub location: String,
    pub item_pattern: String,
    /// Guidance with inline citations removed.
    pub guidance_text: String,
    /// Citations safe to show. Falls back to a directory search link when
    /// no URL survived.
    pub sources: Vec<SourceMetadata>,
}

/// Implementation of the sources_validate tool.
pub async fn validate_impl(
    verifier: &SourceVerifier, params: SourcesValidateParams,
) -> Result<CallToolResult, McpError> {
    let extracted = extract_sources(params.guidance_text.as_deref().unwrap_or_default());

    let mut candidates: Vec<SourceMetadata> = params
        .candidates
        .into_iter()
        .map(|c| SourceMetadata::url_candidate(c.name, c.url))
        .collect();
    candidates.extend(extracted.sources);

    let request = SourceRequest::new(params.location, params.item_pattern)
        .with_guidance(extracted.cleaned_text)
        .with_candidates(candidates);

    let sources = verifier.get_validated_sources(&request).await?;

    let output = SourcesValidateOutput {
        location: request.location,
        item_pattern: request.item_pattern,
        guidance_text: request.guidance_text,
        sources,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize sources: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

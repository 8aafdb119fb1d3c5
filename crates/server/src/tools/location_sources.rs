//! location_sources tool implementation.
//!
//! Filters the citations attached to a city's rule summary down to live
//! ones. Nothing is cached.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use srcwatch_client::SourceVerifier;
use srcwatch_core::{Error, RuleSource};

/// Input parameters for location_sources tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LocationSourcesParams {
    /// City the rules belong to; used for the directory fallback.
    pub city: String,

    /// Citations to check.
    #[serde(default)]
    pub sources: Vec<RuleSource>,
}

/// Output structure for location_sources tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocationSourcesOutput {
    pub city: String,
    /// Live citations, or the directory fallback alone.
    pub sources: Vec<RuleSource>,
}

/// Implementation of the location_sources tool.
pub async fn location_sources_impl(
    verifier: &SourceVerifier, params: LocationSourcesParams,
) -> Result<CallToolResult, McpError> {
    let city = params.city.trim().to_string();
    if city.is_empty() {
        return Err(Error::InvalidInput("city cannot be empty".into()).into());
    }

    let sources = verifier.validate_rule_sources(&city, params.sources).await;

    let output = LocationSourcesOutput { city, sources };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize sources: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

//! source_history tool implementation.
//!
//! Returns the cached record for a location and item together with its
//! probe history.

use chrono::Utc;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use srcwatch_core::{CacheDb, CachedSource, Error, StabilityLogEntry};

const MAX_HISTORY: usize = 200;

/// Input parameters for source_history tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SourceHistoryParams {
    pub location: String,
    pub item_pattern: String,

    /// Maximum number of history rows, newest first (default: 20, max: 200).
    #[serde(default = "default_limit")]
    pub limit: Option<usize>,
}

fn default_limit() -> Option<usize> {
    Some(20)
}

/// Output structure for source_history tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceHistoryOutput {
    pub record: CachedSource,
    pub history: Vec<StabilityLogEntry>,
    /// Failed checks of the primary URL since its last success.
    pub consecutive_failures: u32,
}

/// Implementation of the source_history tool.
pub async fn history_impl(cache: &CacheDb, params: SourceHistoryParams) -> Result<CallToolResult, McpError> {
    if params.location.trim().is_empty() || params.item_pattern.trim().is_empty() {
        return Err(Error::InvalidInput("location and item_pattern are required".into()).into());
    }
    let limit = params.limit.unwrap_or(20).clamp(1, MAX_HISTORY);

    let record = cache
        .get_cached_sources(&params.location, &params.item_pattern, Utc::now())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{}/{}", params.location, params.item_pattern)))?;

    let history = cache.stability_log(record.id, limit).await?;
    let consecutive_failures = match record.sources.iter().find(|s| s.is_url()) {
        Some(primary) => cache.consecutive_failures(&primary.value).await?,
        None => 0,
    };

    let output = SourceHistoryOutput { record, history, consecutive_failures };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize history: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

//! MCP server handler implementation.
//!
//! Routes tool calls to the implementations in [`crate::tools`].

use std::sync::Arc;

use crate::tools::{
    LocationSourcesParams, SourceHistoryParams, SourcesValidateParams, history_impl, location_sources_impl,
    validate_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use srcwatch_client::SourceVerifier;
use srcwatch_core::CacheDb;

/// The main MCP server handler for srcwatch.
#[derive(Clone)]
pub struct SourcesServer {
    tool_router: ToolRouter<Self>,
    verifier: Arc<SourceVerifier>,
    cache: CacheDb,
}

#[tool_router]
impl SourcesServer {
    pub fn new(verifier: Arc<SourceVerifier>, cache: CacheDb) -> Self {
        Self { tool_router: Self::tool_router(), verifier, cache }
    }

    /// Validate the citations for one location and item.
    #[tool(
        description = "Validate municipal recycling citations for a location and item. Returns only live, non-parked sources, using the cache while it is fresh, and a directory search link when nothing survives."
    )]
    async fn sources_validate(&self, params: Parameters<SourcesValidateParams>) -> Result<CallToolResult, McpError> {
        validate_impl(&self.verifier, params.0).await
    }

    /// Filter a city's rule citations without touching the cache.
    #[tool(
        description = "Check the citations attached to a city's recycling rules. Drops dead or malformed links and falls back to a directory search link."
    )]
    async fn location_sources(&self, params: Parameters<LocationSourcesParams>) -> Result<CallToolResult, McpError> {
        location_sources_impl(&self.verifier, params.0).await
    }

    #[tool(description = "Show the cached sources for a location and item with their probe history.")]
    async fn source_history(&self, params: Parameters<SourceHistoryParams>) -> Result<CallToolResult, McpError> {
        history_impl(&self.cache, params.0).await
    }
}

impl ServerHandler for SourcesServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "srcwatch".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Verifies municipal waste-sorting citations. Call sources_validate before showing sources to a user."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcwatch_client::{HttpProber, ProbeConfig};

    #[tokio::test]
    async fn test_registers_all_tools() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let prober = HttpProber::new(ProbeConfig::default()).unwrap();
        let verifier = SourceVerifier::new(Arc::new(prober), Arc::new(cache.clone()));
        let server = SourcesServer::new(Arc::new(verifier), cache);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["location_sources", "source_history", "sources_validate"]);
    }
}

//! MCP transport (spec §4.A/§6): a manual `rmcp::ServerHandler` implementation.
//!
//! Manual impl (no `#[tool_router]`/`#[tool]` macros) because dispatch here is
//! data-driven through a pre-built `ToolRegistry` rather than one generated
//! method per tool — this lets `call_tool` wrap every dispatch with Token
//! Budget accounting and threshold/cleanup handling in one place, per spec
//! §4.A's "every dispatched call is wrapped by Token Budget accounting
//! regardless of success".

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ServerHandler;

use crate::tools::catalog::build_catalog;
use crate::tools::context::{error_envelope, ok_envelope, ToolContext};
use crate::tools::registry::ToolRegistry;

const INSTRUCTIONS: &str = "AI-driven JavaScript reverse-engineering tool server: a stateful \
     bridge between the calling LLM and one live Chromium session over CDP.\n\n\
     WORKFLOW:\n\
     1. browser_launch -> open the managed page\n\
     2. debugger_enable / network_enable -> arm the subsystems you need\n\
     3. breakpoint_set / console_execute / script_search_in_scripts -> investigate\n\
     4. analysis_* tools hand code to an LLM-backed facade for deobfuscation, \
     crypto detection, and code understanding\n\n\
     Large results come back as a `detailId` handle instead of inline JSON once \
     they cross the smart-handle size threshold; call get_detailed_data to page \
     through one. Watch get_budget_stats — call manual_cleanup before the token \
     budget is exhausted.";

/// Binds a built [`ToolRegistry`] to one [`ToolContext`] and exposes it over MCP.
pub struct McpTransport {
    ctx: Arc<ToolContext>,
    registry: ToolRegistry,
    server_name: String,
    server_version: String,
}

impl McpTransport {
    pub fn new(
        ctx: Arc<ToolContext>,
        registry: ToolRegistry,
        server_name: String,
        server_version: String,
    ) -> Self {
        Self {
            ctx,
            registry,
            server_name,
            server_version,
        }
    }

    fn tool_list(&self) -> Vec<Tool> {
        build_catalog()
            .into_iter()
            .map(|spec| {
                let schema = match spec.input_schema {
                    serde_json::Value::Object(map) => map,
                    other => {
                        let mut map = serde_json::Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                };
                Tool::new(spec.name, spec.description, Arc::new(schema))
            })
            .collect()
    }
}

impl ServerHandler for McpTransport {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            server_info: Implementation {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::ErrorData> {
        Ok(ListToolsResult {
            tools: self.tool_list(),
            next_cursor: None,
        })
    }

    /// Dispatches through the registry, then unconditionally records the call
    /// against the Token Budget and runs auto-cleanup past the 90% mark. Never
    /// surfaces a protocol-level error: every outcome becomes a `CallToolResult`,
    /// success or `isError:true`, per spec §7's propagation policy.
    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let tool_name = request.name.to_string();
        let args = request.arguments.map(serde_json::Value::Object).unwrap_or_default();
        let request_bytes = serde_json::to_string(&args).map(|s| s.len()).unwrap_or(0);

        let outcome = self.registry.dispatch(self.ctx.clone(), &tool_name, args).await;

        let (envelope, is_error) = match &outcome {
            Ok(data) => (ok_envelope(data), false),
            Err(err) => {
                tracing::warn!(tool = %tool_name, error = %err, "tool call failed");
                (error_envelope(&err.to_error_body()), true)
            }
        };

        let text = serde_json::to_string(&envelope)
            .unwrap_or_else(|_| "{\"success\":false,\"message\":\"failed to encode result\"}".into());
        let response_bytes = text.len();

        let (warnings, should_cleanup) =
            self.ctx.budget.record_call(&tool_name, request_bytes, response_bytes).await;
        for warning in warnings {
            tracing::warn!(threshold = warning.0, tool = %tool_name, "token budget threshold crossed");
        }
        if should_cleanup {
            tracing::info!(tool = %tool_name, "token budget past 90%, running auto-cleanup");
            self.ctx.budget.auto_cleanup(&self.ctx.details, &self.ctx.caches).await;
        }

        let mut result = CallToolResult::success(vec![Content::text(text)]);
        result.is_error = Some(is_error);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FakeLlmProvider;
    use crate::browser::BrowserSessionManager;
    use crate::cache::UnifiedCacheCoordinator;
    use crate::config::BrowserLaunchConfig;
    use crate::detail_store::DetailStore;
    use crate::tools::build_registry;

    fn make_transport() -> McpTransport {
        let browser = Arc::new(BrowserSessionManager::new(BrowserLaunchConfig::default()));
        let budget = Arc::new(crate::budget::TokenBudget::new());
        let details = Arc::new(DetailStore::new());
        let caches = Arc::new(UnifiedCacheCoordinator::new());
        let llm = Arc::new(FakeLlmProvider::new("{}"));
        let ctx = Arc::new(ToolContext::new(
            browser,
            budget,
            details,
            caches,
            llm,
            "test-server".into(),
            "0.0.0".into(),
        ));
        McpTransport::new(ctx, build_registry(), "test-server".into(), "0.0.0".into())
    }

    #[test]
    fn tool_list_is_non_empty_and_namespaced() {
        let transport = make_transport();
        let tools = transport.tool_list();
        assert!(tools.len() > 40);
        assert!(tools.iter().any(|t| t.name.as_ref() == "browser_launch"));
        assert!(tools.iter().any(|t| t.name.as_ref() == "analysis_detect_crypto"));
    }

    #[tokio::test]
    async fn dispatch_of_unknown_tool_is_an_error_the_transport_would_shape_as_isError() {
        let transport = make_transport();
        let result = transport
            .registry
            .dispatch(transport.ctx.clone(), "does_not_exist", serde_json::json!({}))
            .await;
        assert!(result.is_err());
    }
}

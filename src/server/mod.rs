//! MCP server exposing the analysis tools.

mod requests;

pub use requests::*;

use crate::dispatch::{Dispatcher, ToolRequest};
use crate::tool_registry::{self, ToolCategory};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// MCP server for binary analysis
#[derive(Clone)]
pub struct BinjaMcpServer {
    dispatcher: Arc<Dispatcher>,
    tool_mux: ToolMux<BinjaMcpServer>,
    timeout: Duration,
}

#[derive(Clone)]
struct ToolMux<S> {
    call_router: ToolRouter<S>,
}

impl<S> ToolMux<S>
where
    S: Send + Sync + 'static,
{
    fn new(call_router: ToolRouter<S>) -> Self {
        Self { call_router }
    }

    async fn call(
        &self,
        context: ToolCallContext<'_, S>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        self.call_router.call(context).await
    }

    /// Tools in registry order.
    fn list_all(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        for info in tool_registry::all_tools() {
            if let Some(route) = self.call_router.map.get(info.name) {
                tools.push(route.attr.clone());
            }
        }
        tools
    }
}

impl BinjaMcpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, timeout: Duration) -> Self {
        info!(timeout_secs = timeout.as_secs(), "Creating binja MCP server");
        Self {
            dispatcher,
            tool_mux: ToolMux::new(Self::tool_router()),
            timeout,
        }
    }

    fn instructions(&self) -> String {
        let mut text = String::from(
            "Binary analysis bridge for reverse engineering. Tools operate on the analysis \
             database of the open binary. \
             \n\nNames are matched exactly. When several functions share a name the call fails \
             with 'ambiguous'; rename one of them or use a current_* variant. When \
             function_name is omitted, the function at the current cursor position is used. \
             \n\nTool Categories:",
        );
        for category in ToolCategory::all() {
            let names: Vec<_> = tool_registry::tools_by_category(*category)
                .map(|t| t.name)
                .collect();
            text.push_str(&format!(
                "\n- {}: {} ({})",
                category.as_str(),
                category.description(),
                names.join(", ")
            ));
        }
        text.push_str(
            "\n\nFailures are returned as '[kind] message' with kind one of not_found, \
             ambiguous, no_current_context, invalid_argument, mutation_failed, unavailable, \
             cancelled.",
        );
        text
    }

    async fn run<T: Serialize>(&self, name: &str, params: &T) -> CallToolResult {
        let request = ToolRequest::from_params(name, params);
        self.dispatcher
            .call(request, self.timeout)
            .await
            .into_call_tool_result()
    }
}

// Tool implementations using the #[tool_router] attribute

#[tool_router]
impl BinjaMcpServer {
    #[tool(description = "List functions with pagination (offset, limit 1-10000, default 100) \
        and an optional case-insensitive name filter. Returns total and next_offset.")]
    #[instrument(skip(self), fields(offset = req.offset, limit = req.limit))]
    async fn list_functions(
        &self,
        Parameters(req): Parameters<ListFunctionsRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: list_functions");
        Ok(self.run("list_functions", &req).await)
    }

    #[tool(description = "Get the disassembly of a function, one instruction per line in \
        ascending address order. Uses the current function when function_name is omitted.")]
    #[instrument(skip(self), fields(function = ?req.function_name))]
    async fn get_function_assembly(
        &self,
        Parameters(req): Parameters<FunctionRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: get_function_assembly");
        Ok(self.run("get_function_assembly", &req).await)
    }

    #[tool(description = "Get the disassembly of the function at the current cursor position")]
    #[instrument(skip(self))]
    async fn get_current_function_assembly(&self) -> Result<CallToolResult, McpError> {
        debug!("Tool call: get_current_function_assembly");
        Ok(self.run("get_current_function_assembly", &EmptyParams {}).await)
    }

    #[tool(description = "Get the decompiled representation of a function. \
        Uses the current function when function_name is omitted.")]
    #[instrument(skip(self), fields(function = ?req.function_name))]
    async fn get_function_decompiled(
        &self,
        Parameters(req): Parameters<FunctionRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: get_function_decompiled");
        Ok(self.run("get_function_decompiled", &req).await)
    }

    #[tool(description = "Get the decompiled representation of the function at the current cursor position")]
    #[instrument(skip(self))]
    async fn get_current_function_decompiled(&self) -> Result<CallToolResult, McpError> {
        debug!("Tool call: get_current_function_decompiled");
        Ok(self.run("get_current_function_decompiled", &EmptyParams {}).await)
    }

    #[tool(description = "Get a global variable's address, type and known value by exact name")]
    #[instrument(skip(self), fields(name = %req.variable_name))]
    async fn get_global_variable(
        &self,
        Parameters(req): Parameters<GlobalVariableRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: get_global_variable");
        Ok(self.run("get_global_variable", &req).await)
    }

    #[tool(description = "Get binary metadata: architecture, platform, entry point, segments")]
    #[instrument(skip(self))]
    async fn get_binary_info(&self) -> Result<CallToolResult, McpError> {
        debug!("Tool call: get_binary_info");
        Ok(self.run("get_binary_info", &EmptyParams {}).await)
    }

    #[tool(description = "Rename a function. Uses the current function when function_name is omitted.")]
    #[instrument(skip(self), fields(function = ?req.function_name, new_name = %req.new_name))]
    async fn rename_function(
        &self,
        Parameters(req): Parameters<RenameFunctionRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: rename_function");
        Ok(self.run("rename_function", &req).await)
    }

    #[tool(description = "Rename the function at the current cursor position")]
    #[instrument(skip(self), fields(new_name = %req.new_name))]
    async fn rename_current_function(
        &self,
        Parameters(req): Parameters<RenameCurrentFunctionRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: rename_current_function");
        Ok(self.run("rename_current_function", &req).await)
    }

    #[tool(description = "Rename a local variable of a function. \
        Uses the current function when function_name is omitted.")]
    #[instrument(skip(self), fields(variable = %req.variable_name, new_name = %req.new_name))]
    async fn rename_variable(
        &self,
        Parameters(req): Parameters<RenameVariableRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: rename_variable");
        Ok(self.run("rename_variable", &req).await)
    }

    #[tool(description = "Set the type of a local variable of a function. \
        Uses the current function when function_name is omitted.")]
    #[instrument(skip(self), fields(variable = %req.variable_name, new_type = %req.new_type))]
    async fn set_variable_type(
        &self,
        Parameters(req): Parameters<SetVariableTypeRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: set_variable_type");
        Ok(self.run("set_variable_type", &req).await)
    }

    #[tool(description = "Set the comment at an address inside a function, replacing any \
        existing comment. Uses the current function when function_name is omitted.")]
    #[instrument(skip(self), fields(function = ?req.function_name, address = %req.address))]
    async fn add_comment(
        &self,
        Parameters(req): Parameters<AddCommentRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: add_comment");
        Ok(self.run("add_comment", &req).await)
    }
}

#[tool_handler(router = self.tool_mux)]
impl ServerHandler for BinjaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(self.instructions()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Snapshot;

    fn server() -> BinjaMcpServer {
        let source = Snapshot::from_json(r#"{"functions": [{"name": "main", "start": 4096}]}"#)
            .expect("valid snapshot")
            .into_source();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(source)));
        BinjaMcpServer::new(dispatcher, Duration::from_secs(5))
    }

    #[test]
    fn every_registered_tool_is_routed() {
        let server = server();
        let listed: Vec<_> = server
            .tool_mux
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        let registered: Vec<_> = tool_registry::all_tools()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(listed, registered);
    }

    #[test]
    fn instructions_list_categories() {
        let text = server().instructions();
        for category in ToolCategory::all() {
            assert!(text.contains(category.as_str()));
        }
        assert!(text.contains("rename_current_function"));
    }

    #[tokio::test]
    async fn run_reports_failures_as_errors() {
        let server = server();
        let result = server
            .run(
                "rename_function",
                &RenameFunctionRequest {
                    function_name: Some("main".to_string()),
                    new_name: String::new(),
                },
            )
            .await;
        assert_eq!(result.is_error, Some(true));
    }
}

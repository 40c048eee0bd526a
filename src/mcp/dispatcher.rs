//! Worker-side request dispatch
//!
//! Maps MCP methods onto the music search pipeline:
//! compile the question, execute it read-only, format the rows.

use serde_json::{json, Value};

use super::protocol::{
    codes, methods, InitializeResult, McpHandler, McpNotification, McpRequest, McpResponse,
    ToolCallResult,
};
use super::tools::{get_tool_definitions, SEARCH_MUSIC_DATABASE};
use crate::query::{compile, format_outcome};
use crate::storage::{execute, Store};

pub const MISSING_QUERY: &str = "Please provide a search query";

/// Handler answering catalogue searches against one store
pub struct MusicHandler {
    store: Store,
}

impl MusicHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Compile, execute and format one question
    pub fn search(&self, query: &str) -> String {
        let compiled = compile(query);
        let outcome = execute(&self.store, &compiled);
        tracing::info!(
            rule = ?compiled.rule,
            rows = outcome.len(),
            error = outcome.is_error(),
            "Answered search"
        );
        format_outcome(&outcome, query)
    }

    fn handle_tool_call(&self, name: &str, arguments: Value) -> ToolCallResult {
        match name {
            SEARCH_MUSIC_DATABASE => self.tool_search_music_database(arguments),
            _ => ToolCallResult::error(format!("Unknown tool: {}", name)),
        }
    }

    fn tool_search_music_database(&self, arguments: Value) -> ToolCallResult {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if query.is_empty() {
            return ToolCallResult::text(MISSING_QUERY);
        }
        ToolCallResult::text(self.search(query))
    }
}

impl McpHandler for MusicHandler {
    fn handle_request(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            methods::INITIALIZE => {
                if let Some(client) = request.params.get("clientInfo") {
                    tracing::info!("Client connected: {}", client);
                }
                McpResponse::success(request.id, json!(InitializeResult::default()))
            }
            // Some clients send the initialized notification with an id
            methods::INITIALIZED | methods::PING => McpResponse::success(request.id, json!({})),
            methods::LIST_TOOLS => {
                let tools = get_tool_definitions();
                McpResponse::success(request.id, json!({ "tools": tools }))
            }
            methods::CALL_TOOL => {
                let Some(name) = request.params.get("name").and_then(|v| v.as_str()) else {
                    return McpResponse::error(
                        request.id,
                        codes::INVALID_PARAMS,
                        "Missing tool name",
                    );
                };
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(json!({}));

                let result = self.handle_tool_call(name, arguments);
                McpResponse::success(request.id, json!(result))
            }
            _ => McpResponse::error(
                request.id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_notification(&self, notification: McpNotification) {
        match notification.method.as_str() {
            methods::INITIALIZED => tracing::info!("Client initialized"),
            other => tracing::debug!("Ignoring notification {}", other),
        }
    }
}

/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin
/// 2. Routes tool calls to the activity service
/// 3. Sends JSON-RPC responses to stdout
///
/// Each client session gets its own toggle view; the view is closed when
/// the session ends so late toggle results are discarded.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::*;
use crate::service::ActivityService;
use crate::toggle::ViewId;
use crate::tools::{self, ToolResponse};
use crate::ServerError;

/// MCP server that handles communication with one client
pub struct McpServer {
    service: Arc<ActivityService>,
    /// Toggle view for the current client session
    view: Option<ViewId>,
    initialized: bool,
}

impl McpServer {
    pub fn new(service: Arc<ActivityService>) -> Self {
        Self {
            service,
            view: None,
            initialized: false,
        }
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = tokio::io::stdout();

        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (stdin closed)");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.process_line(&line).await {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }

        self.end_session();
        Ok(())
    }

    /// Process a single line of JSON-RPC input
    async fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        self.handle_request(request).await
    }

    /// Handle a JSON-RPC request; notifications get no response
    async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest { id, method, params } = request;

        if method == "initialized" || method.starts_with("notifications/") {
            if method.ends_with("initialized") {
                self.initialized = true;
            }
            return id.map(|id| JsonRpcResponse::success(id, Value::Null));
        }

        let id = id.unwrap_or(Value::Null);
        let response = match method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, params).await,
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", method),
                None,
            ),
        };
        Some(response)
    }

    fn handle_initialize(&mut self, id: Value) -> JsonRpcResponse {
        info!("MCP client connected");

        // A re-initialize starts a fresh session
        self.end_session();
        self.view = Some(self.service.open_view());

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Habit Activity MCP".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_response(id, &result)
    }

    fn session_view(&mut self) -> ViewId {
        match self.view {
            Some(view) => view,
            None => {
                if !self.initialized {
                    warn!("Tool call before initialize; opening a session view");
                }
                let view = self.service.open_view();
                self.view = Some(view);
                view
            }
        }
    }

    fn end_session(&mut self) {
        if let Some(view) = self.view.take() {
            self.service.close_view(view);
        }
    }

    async fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid parameters: {}", e),
                    None,
                );
            }
            None => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing parameters".to_string(), None);
            }
        };

        let result = self.call_tool(&tool_params.name, tool_params.arguments).await;
        to_response(id, &result)
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, Value>) -> ToolCallResult {
        debug!("Calling tool {}", name);
        let service = Arc::clone(&self.service);

        match name {
            "activity_window" => {
                let view = self.session_view();
                match parse_args(args) {
                    Ok(params) => render(tools::windowed_activity(&service, view, params).await),
                    Err(e) => e,
                }
            }
            "habit_streak" => match parse_args(args) {
                Ok(params) => render(tools::habit_streak(&service, params).await),
                Err(e) => e,
            },
            "completion_toggle" => {
                let view = self.session_view();
                match parse_args(args) {
                    Ok(params) => render(tools::toggle_completion(&service, view, params).await),
                    Err(e) => e,
                }
            }
            "dashboard_snapshot" => render(tools::dashboard_snapshot(&service).await),
            "habit_create" => match parse_args(args) {
                Ok(params) => render(tools::create_habit(&service, params).await),
                Err(e) => e,
            },
            "habit_list" => match parse_args(args) {
                Ok(params) => render(tools::list_habits(&service, params).await),
                Err(e) => e,
            },
            _ => ToolCallResult::error(format!("Unknown tool: {}", name)),
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolCallResult> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ToolCallResult::error(format!("Invalid arguments: {}", e)))
}

fn render<T, E>(result: Result<T, E>) -> ToolCallResult
where
    T: ToolResponse,
    E: std::fmt::Display,
{
    match result {
        Ok(response) => ToolCallResult::success(response.message().to_string(), &response),
        Err(e) => ToolCallResult::error(e.to_string()),
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
    }
}

fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "activity_window".to_string(),
            description: "Completion counts per day for the last 7 or 30 days".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "window": {"type": "integer", "enum": [7, 30], "description": "Window length in days (default 7)"},
                    "anchor": {"type": "string", "description": "Last day of the window, YYYY-MM-DD (optional - defaults to today)"}
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "habit_streak".to_string(),
            description: "Current and longest streak for a habit".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "habit_id": {"type": "string", "description": "ID of the habit"},
                    "mode": {"type": "string", "enum": ["authoritative", "windowed"], "description": "Full history (default) or only the recent window"},
                    "window": {"type": "integer", "enum": [7, 30], "description": "Window length for windowed mode (default 7)"}
                },
                "required": ["habit_id"]
            }),
        },
        ToolDefinition {
            name: "completion_toggle".to_string(),
            description: "Mark a habit complete or not complete for a day, flipping its current state".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "habit_id": {"type": "string", "description": "ID of the habit"},
                    "date": {"type": "string", "description": "Day to toggle, YYYY-MM-DD or a timestamp (optional - defaults to today)"}
                },
                "required": ["habit_id"]
            }),
        },
        ToolDefinition {
            name: "dashboard_snapshot".to_string(),
            description: "Dashboard totals, streaks, per-habit stats and activity charts".to_string(),
            input_schema: json!({"type": "object", "properties": {}, "required": []}),
        },
        ToolDefinition {
            name: "habit_create".to_string(),
            description: "Create a new habit to track".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Name of the habit"},
                    "color": {"type": "string", "description": "Display color as #RRGGBB (optional)"},
                    "frequency": {"type": "string", "description": "How often, e.g. daily (optional)"}
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: "habit_list".to_string(),
            description: "List tracked habits".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "active_only": {"type": "boolean", "description": "Show only active habits (default: true)"}
                },
                "required": []
            }),
        },
    ]
}

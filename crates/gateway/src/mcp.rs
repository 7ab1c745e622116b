//! MCP server: JSON-RPC 2.0 over newline-delimited JSON.
//!
//! Supported methods:
//! - `initialize`: protocol version, tool capability, server info
//! - `notifications/initialized`: acknowledged, no reply
//! - `ping`
//! - `tools/list`: `{name, description, inputSchema}` per tool
//! - `tools/call`: `{content: [{type: "text", text}], isError}`
//!
//! Messages without an `id` are notifications and never get a reply.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use stakeholder_core::error::ToolError;
use stakeholder_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "stakeholder-mcp";

/// Standard JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn reply(id: Value, outcome: Result<Value, JsonRpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            jsonrpc: "2.0".into(),
            id,
            result,
            error,
        }
    }
}

#[derive(Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Dispatches MCP requests to a tool registry.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    version: String,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Handle one raw frame. `None` means nothing should be written back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => Some(JsonRpcResponse::reply(
                Value::Null,
                Err(JsonRpcError::new(codes::PARSE_ERROR, format!("Parse error: {e}"))),
            )),
        }
    }

    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        if value.is_array() {
            return Some(JsonRpcResponse::reply(
                Value::Null,
                Err(JsonRpcError::new(codes::INVALID_REQUEST, "Batch requests are not supported")),
            ));
        }

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => id.map(|id| {
                JsonRpcResponse::reply(
                    id,
                    Err(JsonRpcError::new(codes::INVALID_REQUEST, format!("Invalid request: {e}"))),
                )
            }),
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(request.params.unwrap_or(Value::Null)).await,
            other => Err(JsonRpcError::new(
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Some(JsonRpcResponse::reply(id, outcome))
    }

    fn initialize(&self) -> Value {
        info!(version = %self.version, tools = self.registry.len(), "MCP session initialized");
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": SERVER_NAME, "version": self.version }
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .definitions()
            .into_iter()
            .map(|def| {
                json!({
                    "name": def.name,
                    "description": def.description,
                    "inputSchema": def.parameters
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: Value) -> Result<Value, JsonRpcError> {
        let params: CallParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::new(codes::INVALID_PARAMS, format!("Invalid params: {e}")))?;

        let call = ToolCall {
            id: String::new(),
            name: params.name,
            arguments: params.arguments,
        };
        debug!(tool = %call.name, "tools/call");

        match self.registry.execute(&call).await {
            Ok(result) => Ok(json!({
                "content": [{ "type": "text", "text": result.output }],
                "isError": !result.success
            })),
            Err(ToolError::NotFound(name)) => Err(JsonRpcError::new(
                codes::INVALID_PARAMS,
                format!("Unknown tool: {name}"),
            )),
            Err(ToolError::InvalidArguments(reason)) => Err(JsonRpcError::new(
                codes::INVALID_PARAMS,
                format!("Invalid arguments for {}: {reason}", call.name),
            )),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                Err(JsonRpcError::new(codes::INTERNAL_ERROR, e.to_string()))
            }
        }
    }

    /// Serve newline-delimited JSON-RPC until the reader hits EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(trimmed).await {
                let mut frame = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
                frame.push(b'\n');
                writer.write_all(&frame).await?;
                writer.flush().await?;
            }
        }
        info!("MCP input closed");
        Ok(())
    }

    /// Serve over the process's stdin and stdout.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        info!(tools = self.registry.len(), "MCP server listening on stdio");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }
}

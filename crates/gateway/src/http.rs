//! HTTP gateway.
//!
//! Routes:
//! - `GET  /health`: liveness, never authenticated
//! - `GET  /v1/tools`: tool definitions
//! - `POST /v1/tools/{name}`: run one tool with the JSON body as arguments
//! - `POST /mcp`: one JSON-RPC message through the MCP dispatcher
//!
//! Everything but `/health` goes through [`auth_middleware`]. Bodies are
//! capped at 1 MB.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use serde::Serialize;
use serde_json::{json, Value};
use stakeholder_core::error::ToolError;
use stakeholder_core::tool::{ToolCall, ToolDefinition, ToolRegistry};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::auth_middleware;
use crate::mcp::McpServer;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state behind every route.
pub struct GatewayState {
    mcp: McpServer,
    api_key: Option<String>,
}

impl GatewayState {
    pub fn new(registry: Arc<ToolRegistry>, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.is_empty());
        if api_key.is_none() {
            warn!("No gateway API key configured, running in open mode");
        }
        Self {
            mcp: McpServer::new(registry),
            api_key,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.mcp.registry()
    }
}

pub fn build_router(state: Arc<GatewayState>) -> Router {
    let protected = Router::new()
        .route("/v1/tools", get(list_tools_handler))
        .route("/v1/tools/{name}", post(call_tool_handler))
        .route("/mcp", post(mcp_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start(addr: &str, state: Arc<GatewayState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    tools: usize,
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tools: state.registry().len(),
    })
}

async fn list_tools_handler(State(state): State<Arc<GatewayState>>) -> Json<Vec<ToolDefinition>> {
    Json(state.registry().definitions())
}

async fn call_tool_handler(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let arguments = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(v) => v,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}")),
        }
    };

    let call = ToolCall {
        id: String::new(),
        name,
        arguments,
    };

    match state.registry().execute(&call).await {
        Ok(result) => {
            let status = if result.success {
                StatusCode::OK
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, Json(json!({ "success": result.success, "data": result.data }))).into_response()
        }
        Err(e @ ToolError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ ToolError::InvalidArguments(_)) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            warn!(tool = %call.name, error = %e, "Tool execution failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn mcp_handler(State(state): State<Arc<GatewayState>>, body: String) -> Response {
    match state.mcp.handle_line(&body).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use stakeholder_core::tool::{Tool, ToolResult};
    use tower::ServiceExt;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase a word"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": { "word": { "type": "string" } } })
        }

        async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
            let word = arguments["word"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("missing 'word'".into()))?;
            if word.is_empty() {
                return Ok(ToolResult::failure("empty word"));
            }
            Ok(ToolResult::success(json!({ "word": word.to_uppercase() })))
        }
    }

    fn app(api_key: Option<&str>) -> Router {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UpperTool));
        build_router(Arc::new(GatewayState::new(Arc::new(registry), api_key.map(String::from))))
    }

    fn post_json(uri: &str, body: Value, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(Some("k")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["tools"], 1);
    }

    #[tokio::test]
    async fn protected_routes_need_key() {
        let req = Request::builder().uri("/v1/tools").body(Body::empty()).unwrap();
        let response = app(Some("k")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/v1/tools")
            .header("Authorization", "k")
            .body(Body::empty())
            .unwrap();
        let response = app(Some("k")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await[0]["name"], "upper");
    }

    #[tokio::test]
    async fn open_mode_allows_all() {
        let response = app(None)
            .oneshot(post_json("/v1/tools/upper", json!({"word": "go"}), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["word"], "GO");
    }

    #[tokio::test]
    async fn tool_call_statuses() {
        let key = Some("k");

        let failed = app(key)
            .oneshot(post_json("/v1/tools/upper", json!({"word": ""}), key))
            .await
            .unwrap();
        assert_eq!(failed.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(failed).await["data"]["error"], "empty word");

        let invalid = app(key)
            .oneshot(post_json("/v1/tools/upper", json!({}), key))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let unknown = app(key)
            .oneshot(post_json("/v1/tools/lower", json!({}), key))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mcp_over_http() {
        let key = Some("k");
        let response = app(key)
            .oneshot(post_json(
                "/mcp",
                json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"name": "upper", "arguments": {"word": "hi"}}}),
                key,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["result"]["isError"], false);

        let notification = app(key)
            .oneshot(post_json("/mcp", json!({"jsonrpc": "2.0", "method": "notifications/initialized"}), key))
            .await
            .unwrap();
        assert_eq!(notification.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let big = "x".repeat(MAX_BODY_BYTES + 1);
        let response = app(None)
            .oneshot(post_json("/v1/tools/upper", json!({"word": big}), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}

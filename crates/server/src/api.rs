use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use plotline_dispatch::ToolCall;
use plotline_mcp::{ListToolsResult, ToolInfo};

use crate::state::SharedState;

// ── Health ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub servers: Vec<&'static str>,
    pub timestamp: String,
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        servers: state.domains.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ── Tool discovery and invocation ─────────────────────────────────

/// `GET /tools` — every mounted tool with its input schema, in
/// registration order, same shape as MCP `tools/list`.
pub async fn list_tools(State(state): State<SharedState>) -> Json<ListToolsResult> {
    let tools: Vec<ToolInfo> = state
        .service
        .dispatcher()
        .catalog()
        .list()
        .map(ToolInfo::from)
        .collect();
    Json(ListToolsResult { tools })
}

/// `POST /tools/call` — dispatch one tool call, returning the MCP result
/// envelope. Transport-level errors (malformed body) are the only 4xx;
/// tool failures ride inside the envelope.
pub async fn call_tool(
    State(state): State<SharedState>,
    body: Result<Json<ToolCall>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let Json(call) = body.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let envelope = state.service.dispatcher().dispatch(&call).await;
    Ok(Json(envelope.to_wire()))
}

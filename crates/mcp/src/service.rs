//! Transport-independent MCP service.
//!
//! Wraps the tool dispatcher and answers `initialize`, `tools/list`, and
//! `tools/call`. The stdio loop and the HTTP/SSE binding are both thin
//! shells over this one type, so every transport sees identical behavior.

use std::sync::Arc;

use serde_json::Value;

use plotline_dispatch::{Dispatcher, ToolCall};

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// MCP service bridging a `Dispatcher` to MCP clients.
pub struct McpService {
    dispatcher: Arc<Dispatcher>,
    server_name: String,
    server_version: String,
}

impl McpService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            server_name: "plotline".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set the advertised server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run the message loop over a transport until it closes.
    pub async fn run<T: McpTransport>(&self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, "MCP service starting");

        loop {
            let line = match transport.receive().await? {
                Some(line) => line,
                None => {
                    tracing::info!("transport closed, shutting down");
                    break;
                }
            };

            if let Some(response) = self.handle_line(&line).await {
                let json = serde_json::to_string(&response)?;
                transport.send(&json).await?;
            }
        }

        Ok(())
    }

    /// Process one raw message line. Returns `None` for notifications,
    /// which get no response.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse JSON message");
                // The id cannot be recovered from an unparsable frame.
                return Some(JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id: RpcId::Null,
                    result: None,
                    error: Some(McpError::JsonParse(e).to_rpc_error()),
                });
            }
        };

        // Requests carry an "id"; notifications do not and get no reply.
        if raw.get("id").is_none() {
            if let Some(method) = raw.get("method").and_then(Value::as_str) {
                self.handle_notification(method);
            }
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_value(raw.clone()) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse JSON-RPC request");
                // Echo the id back when it is at least well-formed.
                let id = serde_json::from_value(raw["id"].clone()).unwrap_or(RpcId::Null);
                return Some(JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id,
                    result: None,
                    error: Some(McpError::JsonParse(e).to_rpc_error()),
                });
            }
        };

        Some(self.handle_request(&request).await)
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, &request.params).await,
            method => {
                tracing::warn!(method = %method, "unknown method");
                let err = McpError::MethodNotFound(method.to_string());
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => {
                tracing::info!("client confirmed initialization");
            }
            "notifications/cancelled" => {
                tracing::debug!("client cancelled a request");
            }
            method => {
                tracing::debug!(method = %method, "unknown notification, ignoring");
            }
        }
    }

    fn handle_initialize(&self, id: RpcId) -> JsonRpcResponse {
        tracing::info!("handling initialize");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                let err = McpError::JsonParse(e);
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }

    fn handle_list_tools(&self, id: RpcId) -> JsonRpcResponse {
        tracing::debug!("handling tools/list");

        let tools: Vec<ToolInfo> = self
            .dispatcher
            .catalog()
            .list()
            .map(ToolInfo::from)
            .collect();
        let result = ListToolsResult { tools };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                let err = McpError::JsonParse(e);
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }

    async fn handle_call_tool(&self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        let params = match params {
            Some(p) => p,
            None => {
                let err = McpError::InvalidParams("missing params".to_string());
                return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
            }
        };

        let call_params: CallToolParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => {
                let err = McpError::InvalidParams(e.to_string());
                return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
            }
        };

        tracing::debug!(tool = %call_params.name, "handling tools/call");

        let call = ToolCall {
            name: call_params.name,
            arguments: call_params.arguments,
        };
        let envelope = self.dispatcher.dispatch(&call).await;
        JsonRpcResponse::success(id, envelope.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use async_trait::async_trait;
    use plotline_dispatch::{
        Catalog, ContentBlock, HandlerResult, ParamSpec, ToolDescriptor, ToolHandler,
    };
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, args: Value) -> HandlerResult {
            let message = args["message"].as_str().unwrap_or_default();
            Ok(vec![ContentBlock::text(message)])
        }
    }

    fn test_service() -> McpService {
        let mut catalog = Catalog::new();
        catalog
            .add(ToolDescriptor::new(
                "echo",
                "Echo the message back.",
                vec![ParamSpec::string("message", "Text to echo").required()],
            ))
            .unwrap();
        let mut dispatcher = Dispatcher::new(catalog);
        dispatcher.register("echo", Arc::new(EchoHandler)).unwrap();
        McpService::new(Arc::new(dispatcher))
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools() {
        let service = test_service();
        let req = JsonRpcRequest::new(RpcId::Number(1), "initialize", Some(json!({})));

        let resp = service.handle_request(&req).await;
        assert!(resp.error.is_none());
        let result: InitializeResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
        assert_eq!(result.server_info.name, "plotline");
        assert!(result.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn test_list_tools_renders_schemas() {
        let service = test_service();
        let req = JsonRpcRequest::new(RpcId::Number(2), "tools/list", None);

        let resp = service.handle_request(&req).await;
        let result: ListToolsResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.tools[0].name, "echo");
        assert_eq!(result.tools[0].input_schema["type"], "object");
    }

    #[tokio::test]
    async fn test_call_tool_success_envelope() {
        let service = test_service();
        let req = JsonRpcRequest::new(
            RpcId::Number(3),
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"message": "hello mcp"}})),
        );

        let resp = service.handle_request(&req).await;
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["text"], "hello mcp");
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn test_call_unknown_tool_is_enveloped_not_rpc_error() {
        // Unknown tools are a tool-level failure in the result envelope,
        // not a JSON-RPC error: discovery and dispatch stay consistent.
        let service = test_service();
        let req = JsonRpcRequest::new(
            RpcId::Number(4),
            "tools/call",
            Some(json!({"name": "nonexistent", "arguments": {}})),
        );

        let resp = service.handle_request(&req).await;
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_unknown_method_rpc_error() {
        let service = test_service();
        let req = JsonRpcRequest::new(RpcId::Number(5), "unknown/method", None);

        let resp = service.handle_request(&req).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let service = test_service();
        let response = service
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_parse_error_null_id() {
        let service = test_service();
        let response = service.handle_line("{not json").await.unwrap();
        assert_eq!(response.id, RpcId::Null);
        assert_eq!(response.error.unwrap().code, error_codes::PARSE_ERROR);

        // The serialized frame carries a literal null id.
        let response = service.handle_line("{not json").await.unwrap();
        let wire = serde_json::to_value(&response).unwrap();
        assert!(wire["id"].is_null());
    }

    #[tokio::test]
    async fn test_bad_request_shape_echoes_id() {
        let service = test_service();
        // Valid JSON with an id, but "method" has the wrong type.
        let response = service
            .handle_line(r#"{"jsonrpc":"2.0","id":9,"method":12}"#)
            .await
            .unwrap();
        assert_eq!(response.id, RpcId::Number(9));
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_run_over_channel_transport() {
        let (mut client_side, mut server_side) = ChannelTransport::pair();
        let service = test_service();

        let server_handle =
            tokio::spawn(async move { service.run(&mut server_side).await });

        let init_req = JsonRpcRequest::new(RpcId::Number(1), "initialize", Some(json!({})));
        client_side
            .send(&serde_json::to_string(&init_req).unwrap())
            .await
            .unwrap();

        let resp_line = client_side.receive().await.unwrap().unwrap();
        let resp: JsonRpcResponse = serde_json::from_str(&resp_line).unwrap();
        assert!(resp.error.is_none());

        let call_req = JsonRpcRequest::new(
            RpcId::Number(2),
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"message": "via transport"}})),
        );
        client_side
            .send(&serde_json::to_string(&call_req).unwrap())
            .await
            .unwrap();

        let resp_line = client_side.receive().await.unwrap().unwrap();
        let resp: JsonRpcResponse = serde_json::from_str(&resp_line).unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["text"], "via transport");

        // Closing the client side ends the loop cleanly.
        drop(client_side);
        server_handle.await.unwrap().unwrap();
    }
}

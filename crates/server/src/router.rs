use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::SharedState;
use crate::{api, sse};

pub fn build(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/tools", get(api::list_tools))
        .route("/tools/call", post(api::call_tool))
        .route("/sse", get(sse::sse_connect))
        .route("/messages", post(sse::post_message))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use plotline_domains::{build_dispatcher, DOMAINS};
    use plotline_mcp::McpService;
    use plotline_store::testing::{row, FakeStore};
    use plotline_store::{Capabilities, RecordStore};

    use crate::state::AppState;

    fn test_router() -> (Arc<FakeStore>, Router) {
        let fake = Arc::new(FakeStore::new());
        let store: Arc<dyn RecordStore> = fake.clone();
        let dispatcher =
            build_dispatcher(store, &Capabilities::default(), Duration::from_secs(5)).unwrap();
        let state = Arc::new(AppState {
            service: McpService::new(Arc::new(dispatcher)),
            domains: DOMAINS.to_vec(),
            sessions: Default::default(),
        });
        (fake, build(state))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_lists_domains() {
        let (_fake, router) = test_router();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["servers"].as_array().unwrap().len(), DOMAINS.len());
        assert!(body["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_tools_aggregates_all_domains() {
        let (_fake, router) = test_router();
        let response = router
            .oneshot(Request::get("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let tools = body["tools"].as_array().unwrap();
        assert!(tools.len() >= 40);
        assert!(tools.iter().any(|t| t["name"] == "create_author"));
        assert!(tools[0]["inputSchema"]["type"] == "object");
    }

    #[tokio::test]
    async fn test_call_tool_returns_wire_envelope() {
        let (fake, router) = test_router();
        fake.push_rows(vec![row(&[
            ("id", json!(1)),
            ("name", json!("Jane")),
            ("email", json!("j@x.com")),
        ])]);

        let request = Request::post("/tools/call")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"name": "create_author", "arguments": {"name": "Jane", "email": "j@x.com"}})
                    .to_string(),
            ))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["content"][0]["type"], "text");
        assert!(body.get("isError").is_none());
    }

    #[tokio::test]
    async fn test_call_unknown_tool_enveloped_not_http_error() {
        let (_fake, router) = test_router();
        let request = Request::post("/tools/call")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"name": "summon_dragon", "arguments": {}}).to_string(),
            ))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["isError"], true);
    }

    #[tokio::test]
    async fn test_message_to_unknown_session_404() {
        let (_fake, router) = test_router();
        let request = Request::post("/messages?session=nope")
            .body(Body::from(
                json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}).to_string(),
            ))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

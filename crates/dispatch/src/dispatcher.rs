//! The single call-routing point between transports and handlers.
//!
//! Registration is fail-fast: binding a handler to a name outside the
//! catalog, binding one name twice, or leaving a catalog entry without a
//! handler are all startup errors. Dispatch never lets an error escape:
//! lookup failures, validation failures, timeouts, handler errors, and
//! handler panics all terminate in a failure envelope.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::catalog::Catalog;
use crate::envelope::{ErrorKind, ResponseEnvelope, ToolCall};
use crate::error::RegistryError;
use crate::handler::ToolHandler;
use crate::validate::validate;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Dispatcher {
    catalog: Catalog,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            handlers: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Bind a handler to a catalog name. Fails if the name is not in the
    /// catalog or already has a handler.
    pub fn register(
        &mut self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if !self.catalog.contains(name) {
            return Err(RegistryError::UnknownDescriptor(name.to_string()));
        }
        if self.handlers.contains_key(name) {
            return Err(RegistryError::DuplicateHandler(name.to_string()));
        }
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Verify every catalog entry has exactly one handler. Called once at
    /// startup, after all domain modules have registered.
    pub fn ensure_complete(&self) -> Result<(), RegistryError> {
        let missing: Vec<&str> = self
            .catalog
            .names()
            .filter(|name| !self.handlers.contains_key(*name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::MissingHandlers(missing.join(", ")))
        }
    }

    /// Route one call to its handler and wrap the outcome in an envelope.
    pub async fn dispatch(&self, call: &ToolCall) -> ResponseEnvelope {
        let Some(descriptor) = self.catalog.get(&call.name) else {
            return ResponseEnvelope::failure(
                ErrorKind::UnknownTool,
                format!("Unknown tool: '{}'", call.name),
            );
        };
        let Some(handler) = self.handlers.get(&call.name) else {
            // ensure_complete() makes this unreachable in a running server.
            return ResponseEnvelope::failure(
                ErrorKind::UnknownTool,
                format!("Unknown tool: '{}'", call.name),
            );
        };

        if let Err(violations) = validate(descriptor, &call.arguments) {
            let listing = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return ResponseEnvelope::failure(
                ErrorKind::InvalidArguments,
                format!("Invalid arguments: {listing}"),
            );
        }

        let work = std::panic::AssertUnwindSafe(handler.call(call.arguments.clone()))
            .catch_unwind();
        match tokio::time::timeout(self.timeout, work).await {
            Err(_) => {
                tracing::warn!(tool = %call.name, timeout = ?self.timeout, "tool call timed out");
                ResponseEnvelope::failure(
                    ErrorKind::Timeout,
                    format!(
                        "Tool '{}' did not complete within {}s",
                        call.name,
                        self.timeout.as_secs()
                    ),
                )
            }
            Ok(Err(panic)) => {
                tracing::error!(tool = %call.name, ?panic, "handler panicked");
                ResponseEnvelope::failure(
                    ErrorKind::HandlerFailure,
                    format!("Tool '{}' failed unexpectedly", call.name),
                )
            }
            Ok(Ok(Ok(content))) => ResponseEnvelope::success(content),
            Ok(Ok(Err(err))) => {
                tracing::error!(tool = %call.name, error = %err, "handler returned an error");
                ResponseEnvelope::failure(err.kind(), err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParamSpec, ToolDescriptor};
    use crate::envelope::ContentBlock;
    use crate::error::HandlerError;
    use crate::handler::HandlerResult;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, args: Value) -> HandlerResult {
            let msg = args["message"].as_str().unwrap_or_default();
            Ok(vec![ContentBlock::text(msg)])
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl ToolHandler for SlowHandler {
        async fn call(&self, _args: Value) -> HandlerResult {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![ContentBlock::text("too late")])
        }
    }

    struct ConflictHandler;

    #[async_trait]
    impl ToolHandler for ConflictHandler {
        async fn call(&self, _args: Value) -> HandlerResult {
            Err(HandlerError::Constraint(
                "Series 999999 not found".to_string(),
            ))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl ToolHandler for PanickingHandler {
        async fn call(&self, _args: Value) -> HandlerResult {
            panic!("boom");
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .add(ToolDescriptor::new(
                "echo",
                "Echo a message.",
                vec![ParamSpec::string("message", "text").required()],
            ))
            .unwrap();
        catalog
            .add(ToolDescriptor::new("slow", "Never finishes in time.", vec![]))
            .unwrap();
        catalog
            .add(ToolDescriptor::new("conflict", "Constraint failure.", vec![]))
            .unwrap();
        catalog
            .add(ToolDescriptor::new("panics", "Panics.", vec![]))
            .unwrap();
        catalog
    }

    fn dispatcher() -> Dispatcher {
        let mut d = Dispatcher::new(catalog()).with_timeout(Duration::from_millis(100));
        d.register("echo", Arc::new(EchoHandler)).unwrap();
        d.register("slow", Arc::new(SlowHandler)).unwrap();
        d.register("conflict", Arc::new(ConflictHandler)).unwrap();
        d.register("panics", Arc::new(PanickingHandler)).unwrap();
        d
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let env = dispatcher()
            .dispatch(&ToolCall::new("echo", json!({"message": "hello"})))
            .await;
        assert!(!env.is_error());
        assert_eq!(env.text(), "hello");
    }

    #[tokio::test]
    async fn test_unknown_tool_envelope_not_panic() {
        let env = dispatcher()
            .dispatch(&ToolCall::new("nonexistent", json!({})))
            .await;
        assert_eq!(env.error_kind(), Some(ErrorKind::UnknownTool));
        assert!(env.text().contains("nonexistent"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_lists_field() {
        let env = dispatcher()
            .dispatch(&ToolCall::new("echo", json!({})))
            .await;
        assert_eq!(env.error_kind(), Some(ErrorKind::InvalidArguments));
        assert!(env.text().contains("message"));
    }

    #[tokio::test]
    async fn test_timeout_kind() {
        let env = dispatcher().dispatch(&ToolCall::new("slow", json!({}))).await;
        assert_eq!(env.error_kind(), Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_constraint_failure_passes_through() {
        let env = dispatcher()
            .dispatch(&ToolCall::new("conflict", json!({})))
            .await;
        assert_eq!(env.error_kind(), Some(ErrorKind::ConstraintViolation));
        assert!(env.text().contains("Series 999999 not found"));
    }

    #[tokio::test]
    async fn test_handler_panic_contained() {
        let env = dispatcher()
            .dispatch(&ToolCall::new("panics", json!({})))
            .await;
        assert_eq!(env.error_kind(), Some(ErrorKind::HandlerFailure));
        // The panic payload never reaches the client.
        assert!(!env.text().contains("boom"));
    }

    #[test]
    fn test_register_unknown_name_fails() {
        let mut d = Dispatcher::new(catalog());
        let err = d.register("not_in_catalog", Arc::new(EchoHandler)).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDescriptor(_)));
    }

    #[test]
    fn test_register_twice_fails() {
        let mut d = Dispatcher::new(catalog());
        d.register("echo", Arc::new(EchoHandler)).unwrap();
        let err = d.register("echo", Arc::new(EchoHandler)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateHandler(_)));
    }

    #[test]
    fn test_ensure_complete_names_unbound_tools() {
        let mut d = Dispatcher::new(catalog());
        d.register("echo", Arc::new(EchoHandler)).unwrap();
        let err = d.ensure_complete().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("slow"));
        assert!(msg.contains("conflict"));
    }
}

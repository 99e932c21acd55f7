//! The handler extension point: one executable per tool name.

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::ContentBlock;
use crate::error::HandlerError;

pub type HandlerResult = Result<Vec<ContentBlock>, HandlerError>;

/// The executable bound to a tool name. Handlers receive arguments that
/// already passed shape validation; they own the domain action and the
/// translation of store errors into readable messages.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> HandlerResult;
}

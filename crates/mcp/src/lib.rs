//! MCP (Model Context Protocol) binding for the narrative database.
//!
//! Implements JSON-RPC 2.0 over pluggable transports and bridges it to
//! the tool dispatcher.
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: pluggable transport layer (stdio, channels)
//! - **service**: transport-independent request handling over a `Dispatcher`
//! - **error**: unified error types

pub mod error;
pub mod service;
pub mod transport;
pub mod types;

pub use error::McpError;
pub use service::McpService;
pub use transport::{ChannelTransport, McpTransport, StdioTransport};
pub use types::*;

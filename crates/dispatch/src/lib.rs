//! Tool dispatch core: catalog, validation, and call routing.
//!
//! Every domain module contributes a set of tool descriptors and handlers;
//! this crate owns the single routing point between transports and those
//! handlers. The dispatcher is the error-containment boundary for the
//! process: every call terminates in a `ResponseEnvelope`, never a panic
//! or a propagated error.

pub mod catalog;
pub mod descriptor;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod validate;

pub use catalog::Catalog;
pub use descriptor::{ParamSpec, ParamType, ToolDescriptor};
pub use dispatcher::Dispatcher;
pub use envelope::{ContentBlock, ErrorKind, ResponseEnvelope, ToolCall};
pub use error::{HandlerError, RegistryError};
pub use handler::{HandlerResult, ToolHandler};
pub use validate::{validate, Violation};

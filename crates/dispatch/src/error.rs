//! Error types for registration and handler execution.

use crate::envelope::ErrorKind;

/// Startup-time registration failures. Any of these prevents the process
/// from reaching a running state.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already in the catalog")]
    DuplicateDescriptor(String),

    #[error("handler '{0}' does not match any catalog entry")]
    UnknownDescriptor(String),

    #[error("tool '{0}' already has a handler registered")]
    DuplicateHandler(String),

    #[error("tools without handlers: {0}")]
    MissingHandlers(String),
}

/// Failure a handler can surface. Each variant maps onto one failure
/// envelope kind; the message is what the client sees, so handlers keep
/// it domain-readable (the raw store error is logged, not returned).
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// An argument problem the shape validator cannot see (e.g. duplicate
    /// entries inside an array parameter), detected before any write.
    #[error("Invalid arguments: {0}")]
    Invalid(String),

    /// A store write was rejected by a foreign-key/uniqueness rule,
    /// already translated to a domain-meaningful message.
    #[error("{0}")]
    Constraint(String),

    /// The record store could not be reached or timed out.
    #[error("{0}")]
    Unavailable(String),

    /// Deliberately unimplemented operation.
    #[error("Not yet implemented: {0}")]
    NotImplemented(String),

    /// Anything else; message is sanitized for the client.
    #[error("{0}")]
    Failure(String),
}

impl HandlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::Invalid(_) => ErrorKind::InvalidArguments,
            HandlerError::Constraint(_) => ErrorKind::ConstraintViolation,
            HandlerError::Unavailable(_) => ErrorKind::StoreUnavailable,
            HandlerError::NotImplemented(_) => ErrorKind::NotImplemented,
            HandlerError::Failure(_) => ErrorKind::HandlerFailure,
        }
    }
}

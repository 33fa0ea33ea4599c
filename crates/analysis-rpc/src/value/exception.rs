//! Exceptions as values.
//!
//! [`Exception`] is both the native value that the exception helper
//! flattens and the error type handler methods return, so a failure raised
//! by a handler reaches the client with its kind and message intact.

use thiserror::Error;

/// A failure with a kind (type name), a message and an optional cause.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct Exception {
    pub kind: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<Exception>>,
}

impl Exception {
    /// Kind used for failures that escaped a handler as a panic.
    pub const PANIC_KIND: &'static str = "panic";
    /// Kind used by argument accessors.
    pub const ILLEGAL_ARGUMENT_KIND: &'static str = "IllegalArgument";

    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(Self::ILLEGAL_ARGUMENT_KIND, message)
    }

    /// Wrap a panic payload caught while running a handler.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new(Self::PANIC_KIND, message)
    }

    pub fn with_cause(mut self, cause: Exception) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl From<std::io::Error> for Exception {
    fn from(err: std::io::Error) -> Self {
        Exception::new("std::io::Error", err.to_string())
    }
}

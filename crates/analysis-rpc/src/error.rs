//! Error types for the analysis RPC boundary.
//!
//! Every failure the flattening engine, the dispatcher or the transports can
//! produce is a variant of [`RpcError`]. The server turns these into fault
//! records (see [`FaultKind`]) and the client turns fault records back into
//! [`RpcError::Remote`], so callers on both sides see the same taxonomy.

use crate::value::Exception;
use thiserror::Error;

/// Main error type for the analysis RPC crate.
#[derive(Debug, Error)]
pub enum RpcError {
    // Flattening errors
    #[error("Unsupported value: {message}")]
    Unsupported { message: String },

    #[error("Malformed wire value: {message}")]
    Malformed { message: String },

    // Dispatch errors
    #[error("Failed to find method {method}({arg_types}) on destination {destination}")]
    MethodNotFound {
        destination: String,
        method: String,
        /// Runtime types of the supplied arguments, comma separated.
        arg_types: String,
    },

    #[error("No handler registered for destination {destination}")]
    DestinationNotFound { destination: String },

    #[error("Ambiguous call to {method} on destination {destination}, candidates: {candidates}")]
    AmbiguousMethod {
        destination: String,
        method: String,
        candidates: String,
    },

    #[error("Invocation of {method} on destination {destination} failed: {cause}")]
    Invocation {
        destination: String,
        method: String,
        #[source]
        cause: Exception,
    },

    #[error("Invalid dispatch target: {message}")]
    Construction { message: String },

    // Remote side
    #[error("Remote {kind} failure: {message}")]
    Remote {
        kind: FaultKind,
        message: String,
        /// Exception raised by the remote handler, when one was transported.
        #[source]
        cause: Option<Exception>,
    },

    #[error("Transport error: {message}")]
    Transport { message: String },

    // Codec errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for analysis RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        RpcError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::Transport {
            message: err.to_string(),
        }
    }
}

impl RpcError {
    /// Shorthand for an [`RpcError::Unsupported`].
    pub fn unsupported(message: impl Into<String>) -> Self {
        RpcError::Unsupported {
            message: message.into(),
        }
    }

    /// Shorthand for an [`RpcError::Malformed`].
    pub fn malformed(message: impl Into<String>) -> Self {
        RpcError::Malformed {
            message: message.into(),
        }
    }

    /// Classify this error for the fault record sent back to clients.
    ///
    /// Remote errors keep the kind they arrived with, so a proxying server
    /// forwards the original classification.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            RpcError::MethodNotFound { .. } | RpcError::DestinationNotFound { .. } => {
                FaultKind::MethodNotFound
            }
            RpcError::AmbiguousMethod { .. } => FaultKind::AmbiguousMethod,
            RpcError::Invocation { .. } => FaultKind::InvocationFailed,
            RpcError::Unsupported { .. } | RpcError::Malformed { .. } => {
                FaultKind::UnsupportedValue
            }
            RpcError::Construction { .. } => FaultKind::ConstructionFailed,
            RpcError::Remote { kind, .. } => *kind,
            RpcError::Transport { .. } | RpcError::Io { .. } | RpcError::Json { .. } => {
                FaultKind::Internal
            }
        }
    }

    /// The handler exception carried by this error, if any.
    pub fn cause_exception(&self) -> Option<&Exception> {
        match self {
            RpcError::Invocation { cause, .. } => Some(cause),
            RpcError::Remote { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }

    /// Convert into the exception value that is flattened as a fault record.
    pub fn to_fault(&self) -> Exception {
        let fault = Exception::new(self.fault_kind().as_str(), self.to_string());
        match self.cause_exception() {
            Some(cause) => fault.with_cause(cause.clone()),
            None => fault,
        }
    }

    /// Rebuild a client-side error from a fault exception received over the wire.
    pub fn from_fault(fault: Exception) -> Self {
        let Exception {
            kind,
            message,
            cause,
        } = fault;
        RpcError::Remote {
            kind: FaultKind::parse(&kind),
            message,
            cause: cause.map(|c| *c),
        }
    }
}

/// Discriminant carried by fault records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// No destination or no matching overload.
    MethodNotFound,
    /// Several overloads matched and the target rejects ambiguity.
    AmbiguousMethod,
    /// The resolved method itself failed.
    InvocationFailed,
    /// An argument or result could not be flattened/unflattened.
    UnsupportedValue,
    /// A dispatch target could not be built.
    ConstructionFailed,
    /// Anything else, including exceptions raised by non-RPC peers.
    Internal,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::MethodNotFound => "method_not_found",
            FaultKind::AmbiguousMethod => "ambiguous_method",
            FaultKind::InvocationFailed => "invocation_failed",
            FaultKind::UnsupportedValue => "unsupported_value",
            FaultKind::ConstructionFailed => "construction_failed",
            FaultKind::Internal => "internal_error",
        }
    }

    /// Parse a discriminant. Unknown kinds (e.g. plain exceptions from a
    /// dynamic peer) are classified as [`FaultKind::Internal`].
    pub fn parse(s: &str) -> Self {
        match s {
            "method_not_found" => FaultKind::MethodNotFound,
            "ambiguous_method" => FaultKind::AmbiguousMethod,
            "invocation_failed" => FaultKind::InvocationFailed,
            "unsupported_value" => FaultKind::UnsupportedValue,
            "construction_failed" => FaultKind::ConstructionFailed,
            _ => FaultKind::Internal,
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_found_message() {
        let err = RpcError::MethodNotFound {
            destination: "plotter".into(),
            method: "line".into(),
            arg_types: "int".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to find method line(int) on destination plotter"
        );
        assert_eq!(err.fault_kind(), FaultKind::MethodNotFound);
    }

    #[test]
    fn test_fault_kind_roundtrip() {
        for kind in [
            FaultKind::MethodNotFound,
            FaultKind::AmbiguousMethod,
            FaultKind::InvocationFailed,
            FaultKind::UnsupportedValue,
            FaultKind::ConstructionFailed,
            FaultKind::Internal,
        ] {
            assert_eq!(FaultKind::parse(kind.as_str()), kind);
        }
        assert_eq!(FaultKind::parse("java.lang.Exception"), FaultKind::Internal);
    }

    #[test]
    fn test_fault_preserves_invocation_cause() {
        let err = RpcError::Invocation {
            destination: "d".into(),
            method: "m".into(),
            cause: Exception::new("std::io::Error", "disk on fire"),
        };
        let fault = err.to_fault();
        assert_eq!(fault.kind, "invocation_failed");
        assert_eq!(fault.cause.as_deref().map(|c| c.message.as_str()), Some("disk on fire"));

        match RpcError::from_fault(fault) {
            RpcError::Remote { kind, cause, .. } => {
                assert_eq!(kind, FaultKind::InvocationFailed);
                assert_eq!(cause.unwrap().kind, "std::io::Error");
            }
            other => panic!("Expected Remote, got: {:?}", other),
        }
    }
}

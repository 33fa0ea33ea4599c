//! Request and response envelopes for the HTTP transport.
//!
//! JSON-RPC 2.0 shaped, with params and results carried as encoded
//! [`WireValue`]s (see [`crate::wire::json`]):
//!
//! ```text
//! {"jsonrpc": "2.0", "method": "Analysis.handler", "id": 1,
//!  "params": [{"string": "cat"}, {"array": [...]}]}
//! ```
//!
//! Handler failures are not protocol errors: they come back as a fault
//! record in `result`. The `error` member is reserved for envelopes the
//! server could not interpret.

use crate::wire::WireValue;
use serde::{Deserialize, Serialize};

/// JSON-RPC error code for a body that is not a valid request.
pub const PARSE_ERROR_CODE: i32 = -32700;
/// JSON-RPC error code for an unknown transport method.
pub const METHOD_NOT_FOUND_CODE: i32 = -32601;
/// JSON-RPC error code for params that do not fit the method.
pub const INVALID_PARAMS_CODE: i32 = -32602;
/// JSON-RPC error code for failures inside the server.
pub const INTERNAL_ERROR_CODE: i32 = -32603;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<WireValue>,
    pub id: Option<serde_json::Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<WireValue>, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id: Some(serde_json::Value::Number(id.into())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<WireValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
    pub id: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn success(id: Option<serde_json::Value>, result: WireValue) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(ProtocolError { code, message }),
            id,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolError {
    pub code: i32,
    pub message: String,
}

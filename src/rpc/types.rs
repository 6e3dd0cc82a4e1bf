//! JSON-RPC 2.0 envelope types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Internal error (transport failure, serialization failure)
pub const INTERNAL_ERROR: i64 = -32603;

/// Upstream returned a non-2xx HTTP status
pub const UPSTREAM_HTTP_ERROR: i64 = -32000;

/// Upstream returned 2xx but the body was not valid JSON
pub const INVALID_UPSTREAM_JSON: i64 = -32700;

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC response or error envelope
///
/// `id` is always serialized; error envelopes for unparseable requests carry
/// an explicit `"id": null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }

    /// Envelope as an opaque JSON value for the frame encoder
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": INTERNAL_ERROR, "message": "Internal error" }
            })
        })
    }
}

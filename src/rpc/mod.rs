//! JSON-RPC envelope module

pub mod types;

pub use types::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_UPSTREAM_JSON,
    UPSTREAM_HTTP_ERROR,
};

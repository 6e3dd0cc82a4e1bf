//! Dispatcher and HTTP transport - forwards frames to the upstream endpoint

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::Config;
use crate::rpc::{JsonRpcResponse, INTERNAL_ERROR, INVALID_UPSTREAM_JSON, UPSTREAM_HTTP_ERROR};

/// Result of attempting to parse an inbound frame.
///
/// Frames that fail JSON parsing are still forwarded verbatim; they just
/// cannot be rewritten and carry no extractable id.
#[derive(Debug, Clone)]
pub enum OutboundPayload {
    Parsed(Value),
    Unparsed(String),
}

impl OutboundPayload {
    /// Correlation id of the originating request, when extractable
    pub fn id(&self) -> Option<Value> {
        match self {
            Self::Parsed(value) => value.get("id").cloned(),
            Self::Unparsed(_) => None,
        }
    }
}

/// Parse a frame and apply the one rewrite the bridge performs: an
/// `initialize` request without `params.protocolVersion` gets the configured
/// default injected.
pub fn prepare_payload(frame: &str, default_protocol_version: &str) -> OutboundPayload {
    let mut value: Value = match serde_json::from_str(frame) {
        Ok(value) => value,
        Err(e) => {
            debug!("frame is not JSON, forwarding verbatim: {}", e);
            return OutboundPayload::Unparsed(frame.to_string());
        }
    };

    if let Some(obj) = value.as_object_mut() {
        if obj.get("method").and_then(Value::as_str) == Some("initialize") {
            let params = obj.entry("params").or_insert_with(|| json!({}));
            if !params.is_object() {
                *params = json!({});
            }
            if let Some(params) = params.as_object_mut() {
                params
                    .entry("protocolVersion")
                    .or_insert_with(|| Value::String(default_protocol_version.to_string()));
            }
        }
    }

    OutboundPayload::Parsed(value)
}

/// Forward one frame as an HTTP POST and translate the outcome into the
/// envelope to emit.
///
/// Callers dispatch this per frame without awaiting earlier round trips;
/// replies correlate by `id`, never by completion order. The request carries
/// no timeout - only the event pump's GET is time-bounded.
pub async fn forward(client: &Client, config: &Config, frame: &str) -> Value {
    let payload = prepare_payload(frame, &config.protocol_version);
    let id = payload.id();

    let body = match &payload {
        OutboundPayload::Parsed(value) => match serde_json::to_string(value) {
            Ok(body) => body,
            Err(e) => {
                error!("failed to serialize payload: {}", e);
                return JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()).into_value();
            }
        },
        OutboundPayload::Unparsed(raw) => raw.clone(),
    };

    let url = config.rpc_url();
    debug!("POST {}", url);

    let mut request = client
        .post(&url)
        .header("content-type", "application/json")
        .body(body);
    if let Some(token) = &config.token {
        request = request.header("authorization", format!("Bearer {}", token));
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            error!("upstream request failed: {}", e);
            return JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()).into_value();
        }
    };

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    debug!("HTTP {} bytes={}", status.as_u16(), text.len());

    if !status.is_success() {
        return JsonRpcResponse::error(
            id,
            UPSTREAM_HTTP_ERROR,
            format!("HTTP {}: {}", status.as_u16(), text),
        )
        .into_value();
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(reply) => reply,
        Err(_) => JsonRpcResponse::error(
            id,
            INVALID_UPSTREAM_JSON,
            "Invalid JSON from server".to_string(),
        )
        .into_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_payload_injects_protocol_version() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        match prepare_payload(frame, "2025-03-26") {
            OutboundPayload::Parsed(value) => {
                assert_eq!(value["params"]["protocolVersion"], "2025-03-26");
            }
            OutboundPayload::Unparsed(_) => panic!("expected parsed payload"),
        }
    }

    #[test]
    fn test_prepare_payload_creates_missing_params() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        match prepare_payload(frame, "2025-03-26") {
            OutboundPayload::Parsed(value) => {
                assert_eq!(value["params"]["protocolVersion"], "2025-03-26");
            }
            OutboundPayload::Unparsed(_) => panic!("expected parsed payload"),
        }
    }

    #[test]
    fn test_prepare_payload_keeps_existing_protocol_version() {
        let frame =
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"1.0"}}"#;
        match prepare_payload(frame, "2025-03-26") {
            OutboundPayload::Parsed(value) => {
                assert_eq!(value["params"]["protocolVersion"], "1.0");
            }
            OutboundPayload::Unparsed(_) => panic!("expected parsed payload"),
        }
    }

    #[test]
    fn test_prepare_payload_other_methods_untouched() {
        let frame = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#;
        match prepare_payload(frame, "2025-03-26") {
            OutboundPayload::Parsed(value) => {
                assert!(value.get("params").is_none());
            }
            OutboundPayload::Unparsed(_) => panic!("expected parsed payload"),
        }
    }

    #[test]
    fn test_prepare_payload_passes_non_json_through() {
        match prepare_payload("not json at all", "2025-03-26") {
            OutboundPayload::Unparsed(raw) => assert_eq!(raw, "not json at all"),
            OutboundPayload::Parsed(_) => panic!("expected unparsed payload"),
        }
    }

    #[test]
    fn test_outbound_payload_id() {
        let parsed = prepare_payload(r#"{"jsonrpc":"2.0","id":42,"method":"ping"}"#, "x");
        assert_eq!(parsed.id(), Some(serde_json::json!(42)));

        let unparsed = prepare_payload("garbage", "x");
        assert_eq!(unparsed.id(), None);
    }
}

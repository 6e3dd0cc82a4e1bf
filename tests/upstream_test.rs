//! Tests for the dispatcher / HTTP transport
//! Uses wiremock to mock the upstream MCP endpoint

use std::sync::Arc;

use mcp_bridge::config::{Config, ConfigOptions};
use mcp_bridge::upstream;
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client() -> Client {
    Client::builder().build().unwrap()
}

fn test_config(base_url: &str, options: ConfigOptions) -> Arc<Config> {
    Config::new(base_url.to_string(), options).unwrap()
}

#[tokio::test]
async fn test_forward_passes_reply_through() {
    let mock_server = MockServer::start().await;
    let reply = json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}});

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), ConfigOptions::default());
    let frame = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
    let result = upstream::forward(&test_client(), &config, frame).await;

    assert_eq!(result, reply);
}

#[tokio::test]
async fn test_forward_injects_protocol_version_on_initialize() {
    let mock_server = MockServer::start().await;
    let reply = json!({"jsonrpc": "2.0", "id": 1, "result": {}});

    Mock::given(method("POST"))
        .and(body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2025-03-26"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), ConfigOptions::default());
    let frame = r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
    let result = upstream::forward(&test_client(), &config, frame).await;

    assert_eq!(result, reply);
}

#[tokio::test]
async fn test_forward_keeps_existing_protocol_version() {
    let mock_server = MockServer::start().await;
    let reply = json!({"jsonrpc": "2.0", "id": 1, "result": {}});

    Mock::given(method("POST"))
        .and(body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "1.0"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), ConfigOptions::default());
    let frame = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"1.0"}}"#;
    upstream::forward(&test_client(), &config, frame).await;
}

#[tokio::test]
async fn test_forward_http_error_becomes_32000() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), ConfigOptions::default());
    let frame = r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#;
    let result = upstream::forward(&test_client(), &config, frame).await;

    assert_eq!(
        result,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "error": {"code": -32000, "message": "HTTP 500: boom"}
        })
    );
}

#[tokio::test]
async fn test_forward_invalid_upstream_json_becomes_32700() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), ConfigOptions::default());
    let frame = r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#;
    let result = upstream::forward(&test_client(), &config, frame).await;

    assert_eq!(result["error"]["code"], -32700);
    assert_eq!(result["error"]["message"], "Invalid JSON from server");
    assert_eq!(result["id"], 3);
}

#[tokio::test]
async fn test_forward_transport_error_becomes_32603() {
    // Nothing listens on port 1
    let config = test_config("http://127.0.0.1:1", ConfigOptions::default());
    let frame = r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#;
    let result = upstream::forward(&test_client(), &config, frame).await;

    assert_eq!(result["error"]["code"], -32603);
    assert_eq!(result["id"], 9);
    assert!(!result["error"]["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_forward_error_id_null_when_unparseable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string("totally not json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("bad"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri(), ConfigOptions::default());
    let result = upstream::forward(&test_client(), &config, "totally not json").await;

    assert!(result["id"].is_null());
    assert_eq!(result["error"]["code"], -32000);
}

#[tokio::test]
async fn test_forward_attaches_bearer_token() {
    let mock_server = MockServer::start().await;
    let reply = json!({"jsonrpc": "2.0", "id": 1, "result": {}});

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(
        &mock_server.uri(),
        ConfigOptions {
            token: Some("secret-token".to_string()),
            ..Default::default()
        },
    );
    let frame = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
    let result = upstream::forward(&test_client(), &config, frame).await;

    assert_eq!(result, reply);
}

#[tokio::test]
async fn test_forward_uses_rpc_sub_path() {
    let mock_server = MockServer::start().await;
    let reply = json!({"jsonrpc": "2.0", "id": 1, "result": {}});

    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(
        &mock_server.uri(),
        ConfigOptions {
            rpc_path: Some("rpc".to_string()),
            ..Default::default()
        },
    );
    let frame = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
    let result = upstream::forward(&test_client(), &config, frame).await;

    assert_eq!(result, reply);
}

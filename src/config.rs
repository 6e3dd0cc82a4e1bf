//! Configuration module - connection settings fixed at process start

use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Default HTTP MCP endpoint when none is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4000/mcp";

/// Protocol version injected into `initialize` requests that omit one
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub rpc_path: String,
    pub events_path: String,
    pub protocol_version: String,
    pub token: Option<String>,
    pub force_raw: bool,
    pub debug: bool,
}

/// Optional configuration parameters for Config::new()
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub rpc_path: Option<String>,
    pub events_path: Option<String>,
    pub protocol_version: Option<String>,
    pub token: Option<String>,
    pub force_raw: bool,
    pub debug: bool,
}

impl Config {
    /// Create a new Config with the upstream base URL plus optional settings
    pub fn new(base_url: String, options: ConfigOptions) -> Result<Arc<Self>> {
        // Remove trailing slash so path joining stays predictable
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if base_url.is_empty() {
            return Err(anyhow!("base_url cannot be empty"));
        }

        // Empty token means no Authorization header at all
        let token = options
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Arc::new(Self {
            base_url,
            rpc_path: options.rpc_path.unwrap_or_default(),
            events_path: options.events_path.unwrap_or_default(),
            protocol_version: options
                .protocol_version
                .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
            token,
            force_raw: options.force_raw,
            debug: options.debug,
        }))
    }

    /// URL for JSON-RPC POST requests
    pub fn rpc_url(&self) -> String {
        join_url(&self.base_url, &self.rpc_path)
    }

    /// URL for the SSE event stream, None when the pump is disabled
    pub fn events_url(&self) -> Option<String> {
        if self.events_path.trim().is_empty() {
            None
        } else {
            Some(join_url(&self.base_url, &self.events_path))
        }
    }
}

/// Join a base URL and an optional sub-path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return base.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

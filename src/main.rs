//! mcp-bridge - stdio to HTTP bridge for MCP JSON-RPC clients

use anyhow::Result;
use clap::Parser;
use mcp_bridge::config::{Config, ConfigOptions, DEFAULT_BASE_URL, DEFAULT_PROTOCOL_VERSION};
use mcp_bridge::Bridge;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mcp-bridge")]
#[command(about = "Bridge a stdio MCP client to an HTTP MCP endpoint")]
struct Args {
    /// Base URL of the HTTP MCP endpoint
    #[arg(long, env = "MCP_BRIDGE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Sub-path appended to the base URL for JSON-RPC POSTs
    #[arg(long, env = "MCP_BRIDGE_RPC_PATH", default_value = "")]
    rpc_path: String,

    /// Sub-path of the SSE event stream; empty disables the event pump
    #[arg(long, env = "MCP_BRIDGE_EVENTS_PATH", default_value = "")]
    events_path: String,

    /// Protocol version injected into initialize requests that omit one
    #[arg(long, env = "MCP_BRIDGE_PROTOCOL_VERSION", default_value = DEFAULT_PROTOCOL_VERSION)]
    protocol_version: String,

    /// Bearer token attached to upstream requests
    #[arg(long, env = "MCP_BRIDGE_TOKEN")]
    token: Option<String>,

    /// Always reply with raw newline-delimited JSON
    #[arg(long, env = "MCP_BRIDGE_FORCE_RAW")]
    raw: bool,

    /// Verbose stderr logging
    #[arg(long, env = "MCP_BRIDGE_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the protocol
    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = Config::new(
        args.base_url,
        ConfigOptions {
            rpc_path: Some(args.rpc_path),
            events_path: Some(args.events_path),
            protocol_version: Some(args.protocol_version),
            token: args.token,
            force_raw: args.raw,
            debug: args.debug,
        },
    )?;

    info!("Starting mcp-bridge");

    let bridge = Bridge::new(config, tokio::io::stdout())?;

    // End of input and termination signals both exit 0; a bridge failure is
    // logged rather than mapped to an ad hoc exit code
    tokio::select! {
        result = bridge.run(tokio::io::stdin()) => {
            if let Err(e) = result {
                error!("bridge error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("termination signal received");
        }
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

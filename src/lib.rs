//! mcp-bridge library - stdio to HTTP bridge for MCP JSON-RPC clients

pub mod bridge;
pub mod config;
pub mod events;
pub mod framing;
pub mod rpc;
pub mod upstream;

// Re-export commonly used types
pub use bridge::Bridge;
pub use config::Config;
pub use framing::{FrameDecoder, FrameEncoder, FramingMode};
pub use upstream::OutboundPayload;

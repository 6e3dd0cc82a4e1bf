//! Frame encoder - the single writer of the protocol output stream

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};

use super::FramingMode;

/// Serializes outbound envelopes in the session's framing mode.
///
/// Dispatcher replies and event pump emissions share one encoder; the writer
/// lock guarantees two frames never interleave mid-write. Write failures are
/// logged to stderr and swallowed so one bad write cannot take down the
/// remaining traffic.
pub struct FrameEncoder<W> {
    writer: Mutex<W>,
    mode: Arc<RwLock<FramingMode>>,
}

impl<W: AsyncWrite + Unpin> FrameEncoder<W> {
    pub fn new(writer: W, mode: Arc<RwLock<FramingMode>>) -> Self {
        Self {
            writer: Mutex::new(writer),
            mode,
        }
    }

    /// Shared mode handle; the decoder side is the only writer of it
    pub fn mode_handle(&self) -> Arc<RwLock<FramingMode>> {
        self.mode.clone()
    }

    /// Serialize and write one envelope as a single complete frame
    pub async fn emit(&self, envelope: &Value) {
        let json = match serde_json::to_string(envelope) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to serialize outbound envelope: {}", e);
                return;
            }
        };

        let mode = *self.mode.read().await;
        let mut buffer = Vec::with_capacity(json.len() + 32);
        match mode {
            FramingMode::Raw => {
                buffer.extend_from_slice(json.as_bytes());
                buffer.push(b'\n');
            }
            FramingMode::Header => {
                let header = format!("Content-Length: {}\r\n\r\n", json.len());
                buffer.extend_from_slice(header.as_bytes());
                buffer.extend_from_slice(json.as_bytes());
            }
        }

        debug!("-> client {:?} frame bytes={}", mode, json.len());

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(&buffer).await {
            error!("failed to write frame: {}", e);
            return;
        }
        if let Err(e) = writer.flush().await {
            error!("failed to flush output: {}", e);
        }
    }
}

//! Event pump - pushes server-sent events into the output stream

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::config::Config;
use crate::framing::FrameEncoder;

/// Upper bound on one event stream connection; forces a reconnect even when
/// the server stalls silently
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(90);

/// Wait between reconnect attempts after a failure
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Incremental SSE parser.
///
/// Accumulates text until a blank-line event boundary, then collects the
/// `data:` lines of each block into one JSON value. Events whose data is not
/// valid JSON are dropped.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buf: String,
}

impl SseBuffer {
    pub fn push(&mut self, chunk: &str) -> Vec<Value> {
        self.buf.push_str(chunk);
        let mut out = Vec::new();
        while let Some(idx) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..idx + 2).collect();
            if let Some(value) = parse_event_block(&block) {
                out.push(value);
            }
        }
        out
    }
}

/// Join the `data:` lines of one event block and parse them as JSON
pub fn parse_event_block(block: &str) -> Option<Value> {
    let data: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect();
    if data.is_empty() {
        return None;
    }
    serde_json::from_str(&data.join("\n")).ok()
}

/// Long-lived pump: connect, stream, and reconnect until process exit.
///
/// A non-2xx response just means the endpoint has no push channel; the pump
/// keeps retrying quietly and never surfaces this to the client.
pub async fn run<W>(client: Client, config: Arc<Config>, encoder: Arc<FrameEncoder<W>>)
where
    W: AsyncWrite + Unpin,
{
    let url = match config.events_url() {
        Some(url) => url,
        None => return,
    };
    info!("event pump watching {}", url);

    loop {
        let mut request = client
            .get(&url)
            .header("accept", "text/event-stream")
            .timeout(STREAM_TIMEOUT);
        if let Some(token) = &config.token {
            request = request.header("authorization", format!("Bearer {}", token));
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let mut stream = response.bytes_stream();
                let mut buffer = SseBuffer::default();
                loop {
                    match stream.next().await {
                        Some(Ok(bytes)) => {
                            for event in buffer.push(&String::from_utf8_lossy(&bytes)) {
                                encoder.emit(&event).await;
                            }
                        }
                        Some(Err(e)) => {
                            debug!("event stream read error: {}", e);
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            break;
                        }
                        // Clean end of stream: reconnect right away
                        None => break,
                    }
                }
            }
            Ok(response) => {
                debug!("event stream unavailable: HTTP {}", response.status().as_u16());
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
            Err(e) => {
                debug!("event stream connect failed: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

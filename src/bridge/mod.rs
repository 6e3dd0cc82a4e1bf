//! Bridge orchestration - wires decoder, dispatcher, encoder and event pump

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::events;
use crate::framing::{FrameDecoder, FrameEncoder, FramingMode};
use crate::upstream;

/// stdio to HTTP protocol bridge.
///
/// Generic over the output writer so tests can drive it through an in-memory
/// duplex pipe; the binary wires it to stdout.
pub struct Bridge<W> {
    config: Arc<Config>,
    client: Client,
    mode: Arc<RwLock<FramingMode>>,
    encoder: Arc<FrameEncoder<W>>,
}

impl<W: AsyncWrite + Unpin + Send + 'static> Bridge<W> {
    pub fn new(config: Arc<Config>, output: W) -> Result<Self> {
        let initial = if config.force_raw {
            FramingMode::Raw
        } else {
            FramingMode::Header
        };
        let mode = Arc::new(RwLock::new(initial));
        let encoder = Arc::new(FrameEncoder::new(output, mode.clone()));
        // No request timeout: a long-running tool call may legitimately take
        // minutes, and an unanswered id is the documented failure mode
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            config,
            client,
            mode,
            encoder,
        })
    }

    /// Read frames from `input` until end of input.
    ///
    /// Every complete frame is dispatched on its own task, so the read loop
    /// never waits for an HTTP round trip; replies interleave on the output
    /// stream in completion order and correlate by id.
    pub async fn run<R: AsyncRead + Unpin>(&self, mut input: R) -> Result<()> {
        if self.config.events_url().is_some() {
            let client = self.client.clone();
            let config = self.config.clone();
            let encoder = self.encoder.clone();
            tokio::spawn(async move {
                events::run(client, config, encoder).await;
            });
        }

        let mut decoder = FrameDecoder::new(*self.mode.read().await);
        let mut chunk = [0u8; 8192];

        info!("bridge started, forwarding to {}", self.config.rpc_url());

        loop {
            let n = input
                .read(&mut chunk)
                .await
                .context("failed to read input stream")?;
            if n == 0 {
                break;
            }
            debug!("input chunk bytes={}", n);

            let frames = decoder.feed(&chunk[..n]);

            // The decoder is the only component allowed to change the
            // session framing mode; propagate its downgrade to the encoder
            if decoder.mode() != *self.mode.read().await {
                *self.mode.write().await = decoder.mode();
            }

            for frame in frames {
                debug!("<- client frame bytes={}", frame.len());
                let client = self.client.clone();
                let config = self.config.clone();
                let encoder = self.encoder.clone();
                tokio::spawn(async move {
                    let reply = upstream::forward(&client, &config, &frame).await;
                    encoder.emit(&reply).await;
                });
            }
        }

        info!("end of input");
        Ok(())
    }
}

//! Best-effort block propagation to configured peers.
//!
//! Each broadcast fans out into one task per peer. Outcomes are only logged:
//! there is no acknowledgment, retry or ordering guarantee, and the caller
//! never waits on the network.

use crate::blockchain::Block;
use crate::error::ChainError;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Path on a peer that runs the block acceptance protocol.
pub const RECEIVE_BLOCK_PATH: &str = "/receive-block";

#[derive(Debug, Clone)]
pub struct PeerClient {
    peers: Vec<String>,
    http: Client,
}

impl PeerClient {
    /// Every delivery is bounded by `timeout`.
    pub fn new(peers: Vec<String>, timeout: Duration) -> Result<Self, ChainError> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            ChainError::NetworkError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { peers, http })
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Spawns one delivery task per peer and returns immediately.
    ///
    /// Must be called from within a tokio runtime. The returned handles may be
    /// dropped; the tasks keep running detached.
    pub fn broadcast_block(&self, block: &Block) -> Vec<JoinHandle<()>> {
        if self.peers.is_empty() {
            debug!(height = block.height, "no peers configured, skipping broadcast");
            return Vec::new();
        }

        let block = Arc::new(block.clone());
        self.peers
            .iter()
            .map(|peer| {
                let url = receive_block_url(peer);
                let http = self.http.clone();
                let block = Arc::clone(&block);

                tokio::spawn(async move {
                    match deliver(&http, &url, &block).await {
                        Ok(status) => info!(
                            peer = %url,
                            height = block.height,
                            status = %status,
                            "block sent to peer"
                        ),
                        Err(e) => warn!(
                            peer = %url,
                            height = block.height,
                            error = %e,
                            "failed to send block to peer"
                        ),
                    }
                })
            })
            .collect()
    }
}

async fn deliver(http: &Client, url: &str, block: &Block) -> Result<StatusCode, ChainError> {
    let response = http.post(url).json(block).send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(status);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ChainError::NetworkError(format!(
        "peer answered {}: {}",
        status,
        body.trim()
    )))
}

fn receive_block_url(peer: &str) -> String {
    format!("{}{}", peer.trim_end_matches('/'), RECEIVE_BLOCK_PATH)
}

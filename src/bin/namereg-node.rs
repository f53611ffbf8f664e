#![forbid(unsafe_code)]
//! Name registry node: serves the HTTP API and forwards new blocks to peers

use clap::Parser;
use namereg::config::{load_config, load_config_from};
use namereg::node::Node;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "namereg-node", about = "Run a name registry node")]
struct Args {
    /// TOML config file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override node.node_id
    #[arg(long)]
    node_id: Option<String>,

    /// Override node.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Peer base URL, e.g. http://localhost:8082. Repeatable; replaces configured peers.
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if let Some(node_id) = args.node_id {
        config.node.node_id = node_id;
    }
    if let Some(port) = args.port {
        config.node.port = port;
    }
    if !args.peers.is_empty() {
        config.network.peers = args.peers;
    }

    tracing::info!(
        node = %config.node.node_id,
        port = config.node.port,
        peers = ?config.network.peers,
        "starting name registry node"
    );

    let node = Arc::new(Node::new(config)?);
    node.serve().await?;
    Ok(())
}

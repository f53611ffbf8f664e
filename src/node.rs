use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::error::ChainError;
use crate::network::PeerClient;
use crate::transaction::Transaction;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// One registry node: the chain it owns and the peers it forwards to.
///
/// All chain mutations (local production and peer acceptance) run under the
/// chain's write lock from "read latest" through "append". Broadcasting
/// happens after that lock is released.
pub struct Node {
    pub config: Config,
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub network: Arc<PeerClient>,
    started_at: Instant,
}

impl Node {
    pub fn new(config: Config) -> Result<Self, ChainError> {
        let blockchain = Blockchain::with_genesis_timestamp(config.chain.genesis_timestamp)?;
        Self::with_blockchain(config, blockchain)
    }

    pub fn with_blockchain(config: Config, blockchain: Blockchain) -> Result<Self, ChainError> {
        config.validate()?;
        let network = PeerClient::new(
            config.network.peers.clone(),
            config.network.broadcast_timeout()?,
        )?;

        Ok(Self {
            config,
            blockchain: Arc::new(RwLock::new(blockchain)),
            network: Arc::new(network),
            started_at: Instant::now(),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.config.node.node_id
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Validates `tx`, seals it into a new block, and forwards that block to peers.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<Block, ChainError> {
        let name = tx.name.clone();
        let block = {
            let mut chain = self.blockchain.write().await;
            chain.add_block(vec![tx]).map_err(|e| match e {
                // A single-transaction batch reports the transaction's own error.
                ChainError::InvalidTransactionInBlock { source, .. } => *source,
                other => other,
            })?
        };

        info!(
            node = %self.node_id(),
            name = %name,
            height = block.height,
            hash = %block.hash,
            "registered name in new block"
        );

        self.network.broadcast_block(&block);
        Ok(block)
    }

    pub async fn lookup(&self, name: &str) -> Result<String, ChainError> {
        self.blockchain.read().await.state().lookup(name)
    }

    pub async fn nonce_of(&self, address: &str) -> u64 {
        self.blockchain.read().await.state().nonce_of(address)
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.blockchain.read().await.to_vec()
    }

    pub async fn height(&self) -> u64 {
        self.blockchain.read().await.height()
    }

    /// Runs the acceptance protocol on a peer-supplied block. Accepted blocks
    /// are not relayed further.
    pub async fn receive_block(&self, block: Block) -> Result<u64, ChainError> {
        let height = block.height;
        let result = self.blockchain.write().await.accept_block(block);

        match &result {
            Ok(()) => info!(node = %self.node_id(), height, "accepted block from peer"),
            Err(e) if e.is_stale() => debug!(node = %self.node_id(), height, error = %e, "ignored stale block"),
            Err(e) => warn!(node = %self.node_id(), height, error = %e, "rejected block from peer"),
        }

        result.map(|()| height)
    }

    /// Binds the configured address and serves the HTTP API until the server stops.
    #[cfg(feature = "api")]
    pub async fn serve(self: Arc<Self>) -> Result<(), ChainError> {
        let bind = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .map_err(|e| ChainError::NetworkError(format!("API address {} unavailable: {}", bind, e)))?;

        info!(
            node = %self.node_id(),
            addr = %bind,
            peers = ?self.network.peers(),
            "API server listening"
        );
        crate::api::serve(self, listener).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::error::AuthError;

    fn test_node() -> Node {
        Node::new(Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_submit_and_lookup() {
        let node = test_node();
        let keypair = KeyPair::generate();

        assert_eq!(node.nonce_of(&keypair.address()).await, 0);

        let block = node
            .submit_transaction(Transaction::signed(&keypair, "alice", 0).unwrap())
            .await
            .unwrap();

        assert_eq!(block.height, 1);
        assert_eq!(node.lookup("alice").await.unwrap(), keypair.address());
        assert_eq!(node.nonce_of(&keypair.address()).await, 1);
        assert_eq!(node.blocks().await.len(), 2);
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let node = test_node();
        let keypair = KeyPair::generate();
        node.submit_transaction(Transaction::signed(&keypair, "alice", 0).unwrap())
            .await
            .unwrap();

        let err = node
            .submit_transaction(Transaction::signed(&keypair, "alice", 1).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err, ChainError::NameAlreadyRegistered("alice".to_string()));
        assert_eq!(node.height().await, 1);
        assert_eq!(node.nonce_of(&keypair.address()).await, 1);
    }

    #[tokio::test]
    async fn test_submit_reports_auth_failure() {
        let node = test_node();
        let owner = KeyPair::generate();
        let intruder = KeyPair::generate();
        let mut tx = Transaction::new("alice", owner.address(), 0);
        tx.sign_with(&intruder).unwrap();

        assert_eq!(
            node.submit_transaction(tx).await,
            Err(ChainError::Auth(AuthError::AddressMismatch))
        );
        assert_eq!(node.height().await, 0);
    }

    #[tokio::test]
    async fn test_receive_block_from_peer() {
        let producer = test_node();
        let follower = test_node();
        let keypair = KeyPair::generate();

        let block = producer
            .submit_transaction(Transaction::signed(&keypair, "alice", 0).unwrap())
            .await
            .unwrap();

        assert_eq!(follower.receive_block(block.clone()).await, Ok(1));
        assert_eq!(follower.lookup("alice").await.unwrap(), keypair.address());
        assert!(follower.receive_block(block).await.unwrap_err().is_stale());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_never_fork() {
        let node = Arc::new(test_node());
        let mut handles = Vec::new();
        for i in 0..16 {
            let node = Arc::clone(&node);
            handles.push(tokio::spawn(async move {
                let keypair = KeyPair::generate();
                node.submit_transaction(Transaction::signed(&keypair, format!("name-{}", i), 0).unwrap())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let blocks = node.blocks().await;
        assert_eq!(blocks.len(), 17);
        assert!(node.blockchain.read().await.validate().is_ok());
    }
}

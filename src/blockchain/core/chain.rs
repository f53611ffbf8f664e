use crate::encoding::to_canonical_json;
use crate::error::ChainError;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::state::RegistryState;
use super::validation::{validate_block_linkage, validate_chain_integrity};

/// Fixed genesis time (Unix seconds) so independently started nodes share a genesis hash.
pub const GENESIS_TIMESTAMP: i64 = 1672531200;

/// Immutable, hash-chained batch of transactions.
///
/// JSON field names are capitalized to stay wire compatible with existing nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "Height")]
    pub height: u64,
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "PrevHash")]
    pub prev_hash: String,
    #[serde(rename = "Transactions", default)]
    pub transactions: Vec<Transaction>,
    #[serde(rename = "Hash")]
    pub hash: String,
}

/// Every block field except `hash`, in hashing order.
#[derive(Serialize)]
struct BlockHashPayload<'a> {
    #[serde(rename = "Height")]
    height: u64,
    #[serde(rename = "Timestamp")]
    timestamp: i64,
    #[serde(rename = "PrevHash")]
    prev_hash: &'a str,
    #[serde(rename = "Transactions")]
    transactions: &'a [Transaction],
}

impl Block {
    /// Stamps the current wall-clock time and seals the block. No validation happens here.
    pub fn new(
        height: u64,
        prev_hash: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Result<Self, ChainError> {
        let timestamp = chrono::Utc::now().timestamp();
        Self::with_timestamp(height, timestamp, prev_hash, transactions)
    }

    pub fn with_timestamp(
        height: u64,
        timestamp: i64,
        prev_hash: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Result<Self, ChainError> {
        let mut block = Block {
            height,
            timestamp,
            prev_hash: prev_hash.into(),
            transactions,
            hash: String::new(),
        };
        block.hash = block.calculate_hash()?;
        Ok(block)
    }

    pub fn genesis(timestamp: i64) -> Result<Self, ChainError> {
        Self::with_timestamp(0, timestamp, "", Vec::new())
    }

    /// Lowercase hex SHA-256 over the canonical JSON of every field but `hash`.
    pub fn calculate_hash(&self) -> Result<String, ChainError> {
        let payload = BlockHashPayload {
            height: self.height,
            timestamp: self.timestamp,
            prev_hash: &self.prev_hash,
            transactions: &self.transactions,
        };
        let bytes = to_canonical_json(&payload)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Recomputes the hash and compares it with the stored one.
    pub fn verify_hash(&self) -> Result<(), ChainError> {
        let expected = self.calculate_hash()?;
        if expected != self.hash {
            return Err(ChainError::CorruptBlock {
                expected,
                got: self.hash.clone(),
            });
        }
        Ok(())
    }
}

/// Append-only chain of blocks plus the registry state they produce.
///
/// Methods take `&mut self`; callers sharing a chain wrap it in one lock so
/// that "read latest, validate, append" is a single critical section.
#[derive(Debug, Clone)]
pub struct Blockchain {
    genesis: Block,
    blocks: Vec<Block>,
    state: RegistryState,
}

impl Blockchain {
    /// Create a chain holding only the standard genesis block.
    pub fn new() -> Result<Self, ChainError> {
        Self::with_genesis_timestamp(GENESIS_TIMESTAMP)
    }

    pub fn with_genesis_timestamp(timestamp: i64) -> Result<Self, ChainError> {
        Ok(Blockchain {
            genesis: Block::genesis(timestamp)?,
            blocks: Vec::new(),
            state: RegistryState::new(),
        })
    }

    /// Rebuilds a chain by replaying `blocks` (genesis first) through the acceptance rules.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        let mut iter = blocks.into_iter();
        let genesis = iter
            .next()
            .ok_or_else(|| ChainError::DecodeError("cannot replay an empty chain".to_string()))?;

        if genesis.height != 0 {
            return Err(ChainError::InvalidHeight {
                expected: 0,
                got: genesis.height,
            });
        }
        if !genesis.prev_hash.is_empty() || !genesis.transactions.is_empty() {
            return Err(ChainError::DecodeError(format!(
                "genesis block must have an empty previous hash and no transactions, got prev_hash '{}' and {} transaction(s)",
                genesis.prev_hash,
                genesis.transactions.len()
            )));
        }
        genesis.verify_hash()?;

        let mut chain = Blockchain {
            genesis,
            blocks: Vec::new(),
            state: RegistryState::new(),
        };
        for block in iter {
            chain.accept_block(block)?;
        }
        Ok(chain)
    }

    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    pub fn latest(&self) -> &Block {
        self.blocks.last().unwrap_or(&self.genesis)
    }

    pub fn height(&self) -> u64 {
        self.latest().height
    }

    /// Number of blocks including genesis.
    pub fn len(&self) -> usize {
        self.blocks.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        std::iter::once(&self.genesis).chain(self.blocks.iter())
    }

    pub fn to_vec(&self) -> Vec<Block> {
        self.blocks().cloned().collect()
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    /// Local production: wraps `transactions` in a new block on top of `latest()`.
    ///
    /// The batch is all-or-nothing. Transactions are applied in order to a
    /// snapshot; the first failure rejects the whole batch and leaves both
    /// the block list and the live state untouched.
    pub fn add_block(&mut self, transactions: Vec<Transaction>) -> Result<Block, ChainError> {
        let scratch = apply_all(&self.state, &transactions)?;

        let latest = self.latest();
        let block = Block::new(latest.height + 1, latest.hash.clone(), transactions)?;

        self.state = scratch;
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Peer acceptance: `Received -> Validated -> Applied`, or `Rejected` with no effect.
    pub fn accept_block(&mut self, candidate: Block) -> Result<(), ChainError> {
        validate_block_linkage(self.latest(), &candidate)?;
        candidate.verify_hash()?;

        let scratch = apply_all(&self.state, &candidate.transactions)?;

        self.state = scratch;
        self.blocks.push(candidate);
        Ok(())
    }

    /// Checks every hash and every link from genesis to head.
    pub fn validate(&self) -> Result<(), ChainError> {
        validate_chain_integrity(&self.to_vec())
    }
}

fn apply_all(state: &RegistryState, transactions: &[Transaction]) -> Result<RegistryState, ChainError> {
    let scratch = state.snapshot();
    for (index, tx) in transactions.iter().enumerate() {
        scratch
            .apply(tx)
            .map_err(|e| ChainError::InvalidTransactionInBlock {
                index,
                source: Box::new(e),
            })?;
    }
    Ok(scratch)
}

use crate::error::ChainError;

use super::chain::Block;

/// Checks that `candidate` directly extends `latest`.
///
/// Order matters for callers: anything at or below our height is reported as
/// stale before the previous-hash link is examined.
pub fn validate_block_linkage(latest: &Block, candidate: &Block) -> Result<(), ChainError> {
    if candidate.height <= latest.height {
        return Err(ChainError::StaleOrKnown {
            height: candidate.height,
            latest: latest.height,
        });
    }

    if candidate.prev_hash != latest.hash {
        return Err(ChainError::PrevHashMismatch {
            expected: latest.hash.clone(),
            got: candidate.prev_hash.clone(),
        });
    }

    if candidate.height != latest.height + 1 {
        return Err(ChainError::InvalidHeight {
            expected: latest.height + 1,
            got: candidate.height,
        });
    }

    Ok(())
}

pub fn validate_chain_integrity(blocks: &[Block]) -> Result<(), ChainError> {
    for (i, block) in blocks.iter().enumerate() {
        if block.height != i as u64 {
            return Err(ChainError::InvalidHeight {
                expected: i as u64,
                got: block.height,
            });
        }
        block.verify_hash()?;

        if let Some(prev) = i.checked_sub(1).and_then(|p| blocks.get(p)) {
            if block.prev_hash != prev.hash {
                return Err(ChainError::PrevHashMismatch {
                    expected: prev.hash.clone(),
                    got: block.prev_hash.clone(),
                });
            }
        }
    }
    Ok(())
}

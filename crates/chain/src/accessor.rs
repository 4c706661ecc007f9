//! Contains the [ChainAccessor] trait.

use crate::{Block, ChainError, ChainResult};
use alloy_primitives::B256;
use std::sync::Arc;

/// Describes read access to the persisted source chain.
///
/// Blocks are addressed by `(hash, number)`, the way the source database keys them.
pub trait ChainAccessor {
    /// Reads the block with the given hash at the given height. Returns `Ok(None)` if no such
    /// block is stored.
    fn read_block(&self, hash: B256, number: u64) -> ChainResult<Option<Block>>;

    /// Reads the block with the given hash at the given height, failing with
    /// [ChainError::BlockNotFound] if it is not stored.
    fn block(&self, hash: B256, number: u64) -> ChainResult<Block> {
        self.read_block(hash, number)?.ok_or(ChainError::BlockNotFound { number, hash })
    }
}

impl<T> ChainAccessor for Arc<T>
where
    T: ChainAccessor + ?Sized,
{
    fn read_block(&self, hash: B256, number: u64) -> ChainResult<Option<Block>> {
        (**self).read_block(hash, number)
    }
}

//! Contains the [ChainIndexer], which walks the source chain backward from a head block to
//! genesis.

use crate::{ChainAccessor, ChainResult};
use alloy_primitives::B256;
use tracing::info;

/// The ancestry of a head block, in ascending height order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainIndex {
    /// Hashes of the blocks at heights `0..head_number`. The head itself is not included.
    pub ancestry: Vec<B256>,
    /// The hash of the head block.
    pub head_hash: B256,
    /// The height of the head block.
    pub head_number: u64,
    /// The number of transactions contained in the ancestry blocks.
    pub transaction_count: u64,
}

impl ChainIndex {
    /// Returns the hashes of every block from genesis through the head, inclusive. Position `i`
    /// of the returned list holds the hash of the block at height `i`.
    pub fn replay_range(&self) -> Vec<B256> {
        let mut blocks = Vec::with_capacity(self.ancestry.len() + 1);
        blocks.extend_from_slice(&self.ancestry);
        blocks.push(self.head_hash);
        blocks
    }
}

/// Walks the parent-hash chain of a [ChainAccessor].
#[derive(Debug)]
pub struct ChainIndexer<'a, A: ?Sized> {
    accessor: &'a A,
}

impl<'a, A> ChainIndexer<'a, A>
where
    A: ChainAccessor + ?Sized,
{
    /// Creates a new [ChainIndexer] over the given accessor.
    pub const fn new(accessor: &'a A) -> Self {
        Self { accessor }
    }

    /// Indexes the ancestry of the block with hash `head_hash` at height `head_number`.
    ///
    /// ## Takes
    /// - `head_hash`: The hash of the head block.
    /// - `head_number`: The height of the head block.
    ///
    /// ## Returns
    /// - `Ok(index)` - The hashes of the blocks at heights `0..head_number`, ascending.
    /// - `Err(ChainError::BlockNotFound)` - If the head or any ancestor is missing.
    pub fn index(&self, head_hash: B256, head_number: u64) -> ChainResult<ChainIndex> {
        let mut block = self.accessor.block(head_hash, head_number)?;
        let mut ancestry = Vec::with_capacity(head_number as usize);
        let mut transaction_count = 0u64;
        let mut number = head_number;

        while number > 0 {
            let parent_hash = block.parent_hash();
            number -= 1;
            block = self.accessor.block(parent_hash, number)?;
            info!(target: "indexer", "read block at height {number} with hash {parent_hash}");
            ancestry.push(parent_hash);
            transaction_count += block.transactions().len() as u64;
        }
        ancestry.reverse();

        info!(target: "indexer", "total number of transactions: {transaction_count}");
        Ok(ChainIndex { ancestry, head_hash, head_number, transaction_count })
    }
}

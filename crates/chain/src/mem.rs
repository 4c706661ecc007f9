//! Contains a concrete implementation of the [ChainAccessor] trait that stores blocks in memory.

use crate::{Block, ChainAccessor, ChainResult};
use alloy_primitives::B256;
use std::collections::HashMap;

/// A simple block store that keeps blocks in memory. This is useful for testing and small
/// fixtures.
#[derive(Default, Clone, Debug)]
pub struct MemoryChainDb {
    blocks: HashMap<(u64, B256), Block>,
}

impl MemoryChainDb {
    /// Create a new, empty [MemoryChainDb].
    pub fn new() -> Self {
        Self { blocks: HashMap::new() }
    }

    /// Inserts a block, keyed by its height and header hash. Returns the hash.
    pub fn insert(&mut self, block: Block) -> B256 {
        let hash = block.hash();
        self.blocks.insert((block.number(), hash), block);
        hash
    }

    /// Removes the block stored under the given key.
    pub fn remove(&mut self, hash: B256, number: u64) -> Option<Block> {
        self.blocks.remove(&(number, hash))
    }

    /// Returns the number of stored blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl ChainAccessor for MemoryChainDb {
    fn read_block(&self, hash: B256, number: u64) -> ChainResult<Option<Block>> {
        Ok(self.blocks.get(&(number, hash)).cloned())
    }
}

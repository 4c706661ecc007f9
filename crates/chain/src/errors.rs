//! Errors raised while reading the source chain.

use alloy_primitives::B256;
use thiserror::Error;

/// A [Result] type for the [ChainError].
pub type ChainResult<T> = Result<T, ChainError>;

/// An error encountered while reading blocks from the source chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// No block is stored at the given height with the given hash. Either the database is
    /// corrupt or the starting parameters do not describe a block of this chain.
    #[error("cannot read block at height {number} with hash {hash}")]
    BlockNotFound {
        /// The expected height.
        number: u64,
        /// The expected hash.
        hash: B256,
    },
    /// A stored header or body could not be decoded.
    #[error("failed to decode block data: {0}")]
    Decode(String),
    /// The underlying database reported an error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<alloy_rlp::Error> for ChainError {
    fn from(err: alloy_rlp::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

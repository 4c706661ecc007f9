//! Contains the [Block] type read from the source chain.

use crate::{ChainError, ChainResult};
use alloy_consensus::{Header, TxEnvelope};
use alloy_eips::eip2718::{Decodable2718, Encodable2718};
use alloy_primitives::{Bytes, B256};
use alloy_rlp::Decodable;

/// A source chain block: its header and its transactions in block order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// The transactions included in the block, in their original order.
    pub transactions: Vec<TxEnvelope>,
}

impl Block {
    /// Creates a new [Block].
    pub const fn new(header: Header, transactions: Vec<TxEnvelope>) -> Self {
        Self { header, transactions }
    }

    /// Computes the hash of the block header.
    pub fn hash(&self) -> B256 {
        self.header.hash_slow()
    }

    /// Returns the height of the block.
    pub const fn number(&self) -> u64 {
        self.header.number
    }

    /// Returns the hash of the parent block.
    pub const fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }

    /// Returns the block timestamp.
    pub const fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    /// Returns the transactions of the block.
    pub fn transactions(&self) -> &[TxEnvelope] {
        &self.transactions
    }

    /// RLP-encodes the block body as a list of EIP-2718 encoded transactions.
    pub fn encode_body(&self) -> Vec<u8> {
        let raw = self
            .transactions
            .iter()
            .map(|tx| Bytes::from(tx.encoded_2718()))
            .collect::<Vec<_>>();
        alloy_rlp::encode(&raw)
    }

    /// Decodes a block body produced by [Block::encode_body].
    pub fn decode_body(mut buf: &[u8]) -> ChainResult<Vec<TxEnvelope>> {
        let raw = Vec::<Bytes>::decode(&mut buf)?;
        raw.iter()
            .map(|tx| {
                TxEnvelope::decode_2718(&mut tx.as_ref())
                    .map_err(|e| ChainError::Decode(e.to_string()))
            })
            .collect()
    }
}

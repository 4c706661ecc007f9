//! Test utilities for building small source chains.

use crate::{Block, MemoryChainDb};
use alloy_consensus::{Header, SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy_primitives::{Address, Bytes, Signature, TxKind, B256, U256};

/// Creates a signed legacy transaction with the given nonce. The signature is a fixed test
/// signature and does not recover to a meaningful sender.
pub fn legacy_transaction(nonce: u64) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: Some(5),
        nonce,
        gas_price: 1_000_000_000,
        gas_limit: 21_000,
        to: TxKind::Call(Address::repeat_byte(0x11)),
        value: U256::from(nonce),
        input: Bytes::from(vec![0xde, 0xad, nonce as u8]),
    };
    TxEnvelope::Legacy(tx.into_signed(Signature::test_signature()))
}

/// Creates a signed contract-creation legacy transaction with the given nonce.
pub fn creation_transaction(nonce: u64) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: None,
        nonce,
        gas_price: 20_000_000_000,
        gas_limit: 1_500_000,
        to: TxKind::Create,
        value: U256::ZERO,
        input: Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52]),
    };
    TxEnvelope::Legacy(tx.into_signed(Signature::test_signature()))
}

/// Creates a signed EIP-1559 transaction with the given nonce.
pub fn eip1559_transaction(nonce: u64) -> TxEnvelope {
    let tx = TxEip1559 {
        chain_id: 5,
        nonce,
        gas_limit: 50_000,
        max_fee_per_gas: 30_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: TxKind::Call(Address::repeat_byte(0x22)),
        value: U256::from(1_000u64),
        input: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
        ..Default::default()
    };
    TxEnvelope::Eip1559(tx.into_signed(Signature::test_signature()))
}

/// Builds a linked chain of blocks starting at genesis.
#[derive(Debug, Default)]
pub struct ChainBuilder {
    blocks: Vec<Vec<TxEnvelope>>,
}

impl ChainBuilder {
    /// Creates an empty [ChainBuilder].
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one block per entry, each holding that many legacy transactions.
    pub fn with_tx_counts(mut self, counts: &[usize]) -> Self {
        let mut nonce = self.blocks.iter().map(Vec::len).sum::<usize>() as u64;
        for count in counts {
            let txs = (0..*count)
                .map(|_| {
                    nonce += 1;
                    legacy_transaction(nonce - 1)
                })
                .collect();
            self.blocks.push(txs);
        }
        self
    }

    /// Appends a block holding the given transactions.
    pub fn with_block(mut self, transactions: Vec<TxEnvelope>) -> Self {
        self.blocks.push(transactions);
        self
    }

    /// Links the blocks by parent hash and stores them in a [MemoryChainDb].
    pub fn build(self) -> TestChain {
        let mut db = MemoryChainDb::new();
        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut parent_hash = B256::ZERO;
        for (number, transactions) in self.blocks.into_iter().enumerate() {
            let number = number as u64;
            let header = Header {
                parent_hash,
                number,
                timestamp: 1_548_854_791 + number * 15,
                gas_limit: 10_485_760,
                difficulty: U256::from(1u64),
                beneficiary: Address::repeat_byte(0x0c),
                ..Default::default()
            };
            let block = Block::new(header, transactions);
            parent_hash = db.insert(block.clone());
            blocks.push(block);
        }
        TestChain { db, blocks }
    }
}

/// A chain produced by [ChainBuilder].
#[derive(Debug, Clone)]
pub struct TestChain {
    db: MemoryChainDb,
    blocks: Vec<Block>,
}

impl TestChain {
    /// Returns the store holding the chain.
    pub const fn db(&self) -> &MemoryChainDb {
        &self.db
    }

    /// Consumes the chain, returning its store.
    pub fn into_db(self) -> MemoryChainDb {
        self.db
    }

    /// Returns the blocks in ascending height order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the block hashes in ascending height order.
    pub fn hashes(&self) -> Vec<B256> {
        self.blocks.iter().map(Block::hash).collect()
    }

    /// Returns the highest block.
    ///
    /// # Panics
    /// Panics if the chain is empty.
    pub fn head(&self) -> &Block {
        self.blocks.last().expect("chain has at least one block")
    }
}

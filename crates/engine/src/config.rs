//! Run parameters of a replay: the [ReplayConfig] and the [ReplayCursor].

use crate::{ConfigError, Network};
use serde::Serialize;

/// The default gas budget of a submission, 300 Tgas.
pub const DEFAULT_GAS: u64 = 300_000_000_000_000;

/// The default number of actions in a batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// The queue holds this many batches worth of steps.
const QUEUE_BATCHES: usize = 10;

/// Immutable parameters of a single replay run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayConfig {
    /// Gas budget of a single submission. In batching mode it is split evenly across the
    /// actions of a batch.
    pub gas: u64,
    /// Maximum number of actions per batch.
    pub batch_size: usize,
    /// Skip the begin-block step for blocks without transactions.
    pub skip_empty_blocks: bool,
    /// Group submissions into batched transactions.
    pub batch: bool,
    /// The source network being replayed.
    pub network: Network,
    /// The chain id of the source network.
    pub chain_id: u64,
}

impl ReplayConfig {
    /// Creates a [ReplayConfig] for the given network with the default gas budget and batch
    /// size, batching disabled.
    pub const fn new(network: Network) -> Self {
        Self {
            gas: DEFAULT_GAS,
            batch_size: DEFAULT_BATCH_SIZE,
            skip_empty_blocks: false,
            batch: false,
            network,
            chain_id: network.chain_id(),
        }
    }

    /// Sets the gas budget.
    pub const fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    /// Enables batching with the given batch size.
    pub const fn with_batching(mut self, batch_size: usize) -> Self {
        self.batch = true;
        self.batch_size = batch_size;
        self
    }

    /// Sets whether begin-block steps of empty blocks are skipped.
    pub const fn with_skip_empty_blocks(mut self, skip: bool) -> Self {
        self.skip_empty_blocks = skip;
        self
    }

    /// Checks the parameters for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.gas < self.batch_size as u64 {
            return Err(ConfigError::InsufficientGas { gas: self.gas, batch_size: self.batch_size });
        }
        if self.chain_id != self.network.chain_id() {
            return Err(ConfigError::ChainIdMismatch {
                network: self.network,
                chain_id: self.chain_id,
            });
        }
        Ok(())
    }

    /// Returns the gas allotted to a single action, `gas / batch_size`.
    pub const fn batch_gas(&self) -> u64 {
        self.gas / self.batch_size as u64
    }

    /// Returns the capacity of the step queue between producer and consumer.
    pub const fn queue_capacity(&self) -> usize {
        QUEUE_BATCHES * self.batch_size
    }
}

/// Bounds the replayed region of the source history.
///
/// Positions are `(block, transaction index)` pairs. Everything before the start point is
/// skipped, everything from the break point on is never emitted. A zero start point means no
/// skipping, a zero `break_block` means no break.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayCursor {
    /// First block of the active window.
    pub start_block: u64,
    /// First transaction of `start_block` in the active window.
    pub start_tx: u64,
    /// Block of the break point, `0` to replay to the end.
    pub break_block: u64,
    /// Transaction of the break point. `0` breaks before `break_block` is read.
    pub break_tx: u64,
}

impl ReplayCursor {
    /// Creates a [ReplayCursor] starting at the given position without a break point.
    pub const fn starting_at(start_block: u64, start_tx: u64) -> Self {
        Self { start_block, start_tx, break_block: 0, break_tx: 0 }
    }

    /// Sets the break point.
    pub const fn with_break(mut self, break_block: u64, break_tx: u64) -> Self {
        self.break_block = break_block;
        self.break_tx = break_tx;
        self
    }

    /// Returns `true` if a break point is set.
    pub const fn has_break(&self) -> bool {
        self.break_block != 0
    }

    /// Returns `true` if the run stops before reading block `number`, either because the break
    /// point is its first transaction or because the break point was passed in an earlier block.
    pub const fn breaks_at_block(&self, number: u64) -> bool {
        self.has_break()
            && (number > self.break_block || (number == self.break_block && self.break_tx == 0))
    }

    /// Returns `true` if the run stops at transaction `index` of block `number`.
    pub const fn breaks_at_tx(&self, number: u64, index: u64) -> bool {
        self.has_break() && number == self.break_block && index == self.break_tx
    }

    /// Returns `true` if block `number` lies entirely before the start point.
    pub const fn skips_block(&self, number: u64) -> bool {
        number < self.start_block
    }

    /// Returns `true` if transaction `index` of block `number` lies before the start point.
    pub const fn skips_tx(&self, number: u64, index: u64) -> bool {
        number == self.start_block && index < self.start_tx
    }

    /// Checks that the break point does not precede the start point.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.has_break() && (self.break_block, self.break_tx) < (self.start_block, self.start_tx)
        {
            return Err(ConfigError::InvalidCursor {
                start_block: self.start_block,
                start_tx: self.start_tx,
                break_block: self.break_block,
                break_tx: self.break_tx,
            });
        }
        Ok(())
    }
}

//! Error types of the replay engine.

use crate::{Network, RetryExhausted, TxSummary};
use replay_chain::ChainError;
use thiserror::Error;

/// A [Result] type for the [ReplayError].
pub type ReplayResult<T> = Result<T, ReplayError>;

/// A fatal replay error. Every variant aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// A source block could not be read.
    #[error(transparent)]
    Read(#[from] ChainError),
    /// A source transaction could not be encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// A read-style remote call failed on every attempt.
    #[error(transparent)]
    RetryExhausted(#[from] RetryExhausted),
    /// The target ledger reported a failure status.
    #[error(transparent)]
    SubmissionFailed(#[from] SubmissionFailed),
    /// The run parameters are conflicting or incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The ledger client failed to deliver a submission.
    #[error("ledger client error: {0}")]
    Ledger(String),
    /// The step producer task did not complete.
    #[error("step producer failed: {0}")]
    Producer(String),
}

/// An error encoding a source transaction for submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The transaction type cannot be executed by the target contract.
    #[error("unsupported transaction type: {0}")]
    UnsupportedTransactionType(u8),
    /// The bytes do not hold a valid EIP-2718 transaction.
    #[error("failed to decode transaction: {0}")]
    Decode(String),
}

/// The target ledger reported a failure for a submission or batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transaction failed: {status}")]
pub struct SubmissionFailed {
    /// The status object reported by the target ledger.
    pub status: String,
    /// The decoded source transaction, when the failing submission was a single transaction.
    pub transaction: Option<Box<TxSummary>>,
}

/// Conflicting or missing run parameters, detected before any remote activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No network was selected.
    #[error("one of the options --goerli, --rinkeby, or --ropsten is mandatory")]
    MissingNetwork,
    /// Two network selectors were set at once.
    #[error("the options --{0} and --{1} exclude each other")]
    ConflictingNetworks(Network, Network),
    /// The chain id does not belong to the selected network.
    #[error("chain id {chain_id} does not match network {network}")]
    ChainIdMismatch {
        /// The selected network.
        network: Network,
        /// The configured chain id.
        chain_id: u64,
    },
    /// The batch size is zero.
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    /// The gas budget cannot be split across a batch.
    #[error("gas budget {gas} is smaller than the batch size {batch_size}")]
    InsufficientGas {
        /// The configured gas budget.
        gas: u64,
        /// The configured batch size.
        batch_size: usize,
    },
    /// The break point lies before the start point.
    #[error("break point ({break_block}, {break_tx}) precedes start point ({start_block}, {start_tx})")]
    InvalidCursor {
        /// Start block.
        start_block: u64,
        /// Start transaction.
        start_tx: u64,
        /// Break block.
        break_block: u64,
        /// Break transaction.
        break_tx: u64,
    },
    /// A retried call would never be attempted.
    #[error("the number of retries must be greater than zero")]
    ZeroRetries,
    /// A required parameter is missing.
    #[error("option --{0} is mandatory")]
    Missing(&'static str),
    /// The genesis file could not be used.
    #[error("invalid genesis configuration: {0}")]
    Genesis(String),
}

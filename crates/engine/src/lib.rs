#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod errors;
pub use errors::{ConfigError, EncodingError, ReplayError, ReplayResult, SubmissionFailed};

mod config;
pub use config::{ReplayConfig, ReplayCursor, DEFAULT_BATCH_SIZE, DEFAULT_GAS};

mod network;
pub use network::{AccountBalance, BeginBlockArgs, BeginChainArgs, GenesisConfig, Network};

mod encode;
pub use encode::{encode_transaction, TxSummary};

mod step;
pub use step::{
    ReplayStep, Submission, SubmissionKind, BEGIN_BLOCK_METHOD, BEGIN_CHAIN_METHOD, SUBMIT_METHOD,
};

mod ledger;
pub use ledger::{AccountCreator, FunctionCallAction, LedgerClient};

mod generator;
pub use generator::StepGenerator;

mod submitter;
pub use submitter::{Batch, BatchSubmitter, ReplaySummary};

mod verifier;
pub use verifier::{verify_outcome, SubmissionOutcome};

mod retry;
pub use retry::{exponential_backoff, BackoffPolicy, RetryExhausted};

mod driver;
pub use driver::ReplayDriver;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

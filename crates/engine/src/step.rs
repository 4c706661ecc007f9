//! The units of work flowing from the generator to the submitter.

use crate::ReplayError;
use alloy_consensus::TxEnvelope;
use alloy_primitives::Bytes;

/// Method of the bootstrap step.
pub const BEGIN_CHAIN_METHOD: &str = "begin_chain";

/// Method announcing the context of the following transactions.
pub const BEGIN_BLOCK_METHOD: &str = "begin_block";

/// Method executing one source transaction.
pub const SUBMIT_METHOD: &str = "submit";

/// What a [Submission] replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    /// Initializes the target contract with the genesis state.
    Bootstrap,
    /// Sets the block context.
    BeginBlock,
    /// Executes a source transaction.
    Transaction,
}

/// A remote call against the target contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// What the call replays.
    pub kind: SubmissionKind,
    /// The contract method.
    pub method_name: String,
    /// The encoded arguments.
    pub args: Bytes,
    /// A diagnostic line printed before the call.
    pub comment: Option<String>,
    /// The source transaction, for [SubmissionKind::Transaction].
    pub source_tx: Option<TxEnvelope>,
}

/// One step of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStep {
    /// A diagnostic line.
    Comment(String),
    /// A fatal error. Nothing follows it.
    Error(ReplayError),
    /// A remote call.
    Submission(Submission),
}

impl ReplayStep {
    /// Returns the [Submission], if this step is one.
    pub const fn as_submission(&self) -> Option<&Submission> {
        match self {
            Self::Submission(submission) => Some(submission),
            _ => None,
        }
    }

    /// Returns the comment text, if this step is a comment.
    pub fn as_comment(&self) -> Option<&str> {
        match self {
            Self::Comment(text) => Some(text),
            _ => None,
        }
    }
}

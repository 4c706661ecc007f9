//! Checks the outcome reported by the target ledger for every submission.

use crate::{SubmissionFailed, TxSummary};
use alloy_consensus::TxEnvelope;
use serde_json::Value;
use tracing::{error, info};

/// The accepted outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// The id of the target ledger transaction, when reported.
    pub transaction_id: Option<String>,
    /// The reported status object.
    pub status: Value,
}

/// Verifies the response of a single or batched submission.
///
/// ## Takes
/// - `batch`: Whether the response belongs to a batched transaction.
/// - `source_tx`: The replayed source transaction, for unbatched transaction submissions.
/// - `response`: The raw response of the target ledger.
///
/// ## Returns
/// - `Ok(SubmissionOutcome)`: The status reports success.
/// - `Err(SubmissionFailed)`: The status is missing or reports a failure. Outside of
///   batching the error carries the decoded source transaction.
pub fn verify_outcome(
    batch: bool,
    source_tx: Option<&TxEnvelope>,
    response: &Value,
) -> Result<SubmissionOutcome, SubmissionFailed> {
    let transaction_id =
        response.pointer("/transaction/hash").and_then(Value::as_str).map(str::to_owned);
    if let Some(id) = &transaction_id {
        info!(target: "verifier", "Transaction Id {id}");
    }

    let status = response.get("status").cloned().unwrap_or(Value::Null);
    let pretty = serde_json::to_string_pretty(&status).unwrap_or_else(|_| status.to_string());
    info!(target: "verifier", "status:\n{pretty}");

    let failed = match &status {
        Value::Object(fields) => fields.get("Failure").is_some_and(|failure| !failure.is_null()),
        _ => true,
    };
    if !failed {
        return Ok(SubmissionOutcome { transaction_id, status });
    }

    let transaction = if batch {
        None
    } else {
        source_tx.and_then(|tx| TxSummary::try_from(tx).ok())
    };
    if let Some(tx) = &transaction {
        error!(target: "verifier", "failed {tx}");
    }
    Err(SubmissionFailed { status: status.to_string(), transaction: transaction.map(Box::new) })
}

//! Traits of the target ledger collaborators.

use alloy_primitives::Bytes;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;

/// One function call inside a batched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionCallAction {
    /// The contract method.
    pub method_name: String,
    /// The encoded arguments.
    pub args: Bytes,
    /// Gas attached to the call.
    pub gas: u64,
    /// Deposit attached to the call.
    pub deposit: u128,
}

/// A signed session against the target ledger.
///
/// Responses are the raw JSON outcome of the transaction, carrying a `status` object and a
/// `transaction` object.
#[async_trait]
pub trait LedgerClient {
    /// The transport error.
    type Error: Display + Send;

    /// Calls a single method of the contract.
    ///
    /// ## Takes
    /// - `contract`: The account of the target contract.
    /// - `method_name`: The contract method.
    /// - `args`: The encoded arguments.
    /// - `gas`: Gas attached to the call.
    /// - `deposit`: Deposit attached to the call.
    ///
    /// ## Returns
    /// - `Ok(Value)`: The transaction outcome.
    /// - `Err(Self::Error)`: The call was not delivered.
    async fn call_method(
        &mut self,
        contract: &str,
        method_name: &str,
        args: Bytes,
        gas: u64,
        deposit: u128,
    ) -> Result<Value, Self::Error>;

    /// Signs and sends one transaction holding all `actions`, executed in order.
    async fn submit_batch(
        &mut self,
        contract: &str,
        actions: Vec<FunctionCallAction>,
    ) -> Result<Value, Self::Error>;
}

/// Creates accounts on the target ledger.
#[async_trait]
pub trait AccountCreator {
    /// The transport error.
    type Error: Display + Send;

    /// Creates `new_account_id` as a sub-account of `parent_account_id`, funded with
    /// `initial_balance`.
    async fn create_account(
        &mut self,
        new_account_id: &str,
        parent_account_id: &str,
        initial_balance: u128,
    ) -> Result<Value, Self::Error>;
}

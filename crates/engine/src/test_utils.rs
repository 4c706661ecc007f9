//! Test utilities for the replay engine.

use crate::{AccountCreator, FunctionCallAction, LedgerClient};
use alloy_primitives::Bytes;
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

/// Returns a successful transaction outcome with the given transaction id.
pub fn success_response(id: &str) -> Value {
    json!({
        "status": { "SuccessValue": "" },
        "transaction": { "hash": id },
    })
}

/// Returns a failed transaction outcome.
pub fn failure_response() -> Value {
    json!({
        "status": {
            "Failure": {
                "ActionError": {
                    "index": 0,
                    "kind": { "FunctionCallError": { "ExecutionError": "EvmError(Revert)" } },
                },
            },
        },
        "transaction": { "hash": "failed" },
    })
}

/// A call recorded by the [TestLedgerClient].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// A [LedgerClient::call_method] call.
    Single {
        /// The contract account.
        contract: String,
        /// The method.
        method_name: String,
        /// The arguments.
        args: Bytes,
        /// The attached gas.
        gas: u64,
        /// The attached deposit.
        deposit: u128,
    },
    /// A [LedgerClient::submit_batch] call.
    Batch {
        /// The contract account.
        contract: String,
        /// The batched actions.
        actions: Vec<FunctionCallAction>,
    },
    /// An [AccountCreator::create_account] call.
    CreateAccount {
        /// The created account.
        new_account_id: String,
        /// Its parent.
        parent_account_id: String,
        /// The funded balance.
        initial_balance: u128,
    },
}

/// An error returned by the [TestLedgerClient].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("connection to the test ledger was lost")]
pub struct TestLedgerError;

/// A [LedgerClient] recording every call and answering with canned outcomes.
#[derive(Debug, Clone, Default)]
pub struct TestLedgerClient {
    calls: Vec<LedgerCall>,
    fail_on: Option<usize>,
    disconnect_on: Option<usize>,
}

impl TestLedgerClient {
    /// Creates a client accepting every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers call number `n` (counting from zero) with a failure outcome.
    pub const fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Fails call number `n` (counting from zero) with a [TestLedgerError].
    pub const fn disconnect_on_call(mut self, n: usize) -> Self {
        self.disconnect_on = Some(n);
        self
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> &[LedgerCall] {
        &self.calls
    }

    fn record(&mut self, call: LedgerCall) -> Result<Value, TestLedgerError> {
        let n = self.calls.len();
        self.calls.push(call);
        if self.disconnect_on == Some(n) {
            return Err(TestLedgerError);
        }
        if self.fail_on == Some(n) {
            return Ok(failure_response());
        }
        Ok(success_response(&format!("tx-{n}")))
    }
}

#[async_trait]
impl LedgerClient for TestLedgerClient {
    type Error = TestLedgerError;

    async fn call_method(
        &mut self,
        contract: &str,
        method_name: &str,
        args: Bytes,
        gas: u64,
        deposit: u128,
    ) -> Result<Value, Self::Error> {
        self.record(LedgerCall::Single {
            contract: contract.to_string(),
            method_name: method_name.to_string(),
            args,
            gas,
            deposit,
        })
    }

    async fn submit_batch(
        &mut self,
        contract: &str,
        actions: Vec<FunctionCallAction>,
    ) -> Result<Value, Self::Error> {
        self.record(LedgerCall::Batch { contract: contract.to_string(), actions })
    }
}

#[async_trait]
impl AccountCreator for TestLedgerClient {
    type Error = TestLedgerError;

    async fn create_account(
        &mut self,
        new_account_id: &str,
        parent_account_id: &str,
        initial_balance: u128,
    ) -> Result<Value, Self::Error> {
        self.record(LedgerCall::CreateAccount {
            new_account_id: new_account_id.to_string(),
            parent_account_id: parent_account_id.to_string(),
            initial_balance,
        })
    }
}

//! A JSON-RPC client of the ledger gateway.
//!
//! The gateway holds the signing key of the replaying account, signs the transactions it is
//! asked to send and answers with their final outcome.

use alloy_primitives::Bytes;
use async_trait::async_trait;
use replay_engine::{AccountCreator, FunctionCallAction, LedgerClient};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use thiserror::Error;
use tracing::trace;

/// Calls one contract method in its own transaction.
pub(crate) const CALL_FUNCTION_METHOD: &str = "call_function";

/// Signs and sends a transaction holding a list of actions.
pub(crate) const SIGN_AND_SEND_METHOD: &str = "sign_and_send_transaction";

/// Looks up the access key of an account.
pub(crate) const VIEW_ACCESS_KEY_METHOD: &str = "view_access_key";

/// Creates a sub-account.
pub(crate) const CREATE_ACCOUNT_METHOD: &str = "create_account";

/// An error talking to the ledger gateway.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The request did not complete.
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The gateway answered with an error object.
    #[error("gateway error {code}: {message}")]
    Rpc {
        /// The error code.
        code: i64,
        /// The error message.
        message: String,
    },
    /// The gateway answered with neither a result nor an error.
    #[error("gateway response without result")]
    MissingResult,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn into_result(self) -> Result<Value, RpcError> {
        if let Some(error) = self.error {
            return Err(RpcError::Rpc { code: error.code, message: error.message });
        }
        self.result.ok_or(RpcError::MissingResult)
    }
}

/// A client of the ledger gateway, acting as `signer_id`.
#[derive(Debug)]
pub struct GatewayClient {
    /// The URL of the gateway.
    url: String,
    /// The account signing every transaction.
    signer_id: String,
    /// The inner reqwest client.
    inner: Client,
    next_id: AtomicU64,
}

impl GatewayClient {
    /// Creates a new [GatewayClient].
    ///
    /// ## Takes
    /// - `url`: The URL of the gateway.
    /// - `signer_id`: The account signing every transaction.
    /// - `timeout`: The timeout of a single request.
    pub fn new(
        url: impl Into<String>,
        signer_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self { url: url.into(), signer_id: signer_id.into(), inner, next_id: AtomicU64::new(1) })
    }

    /// Returns the signing account.
    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    /// Sends a JSON-RPC request and returns its result.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(target: "rpc", "request {id}: {method}");
        let request = JsonRpcRequest { jsonrpc: "2.0", id, method, params };
        let response = self.inner.post(&self.url).json(&request).send().await?;
        let response = response.json::<JsonRpcResponse>().await?;
        response.into_result()
    }

    /// Returns the access key of `account_id` registered for the signing key.
    pub async fn view_access_key(&self, account_id: &str) -> Result<Value, RpcError> {
        self.request(VIEW_ACCESS_KEY_METHOD, json!({ "account_id": account_id })).await
    }
}

/// Returns the parameters of a `call_function` request.
pub(crate) fn call_function_params(
    signer_id: &str,
    contract: &str,
    method_name: &str,
    args: &Bytes,
    gas: u64,
    deposit: u128,
) -> Value {
    json!({
        "signer_id": signer_id,
        "receiver_id": contract,
        "method_name": method_name,
        "args": args,
        "gas": gas,
        "deposit": deposit.to_string(),
    })
}

/// Returns the parameters of a `sign_and_send_transaction` request.
pub(crate) fn sign_and_send_params(
    signer_id: &str,
    contract: &str,
    actions: &[FunctionCallAction],
) -> Value {
    let actions = actions
        .iter()
        .map(|action| {
            json!({
                "FunctionCall": {
                    "method_name": action.method_name,
                    "args": action.args,
                    "gas": action.gas,
                    "deposit": action.deposit.to_string(),
                }
            })
        })
        .collect::<Vec<_>>();
    json!({ "signer_id": signer_id, "receiver_id": contract, "actions": actions })
}

#[async_trait]
impl LedgerClient for GatewayClient {
    type Error = RpcError;

    async fn call_method(
        &mut self,
        contract: &str,
        method_name: &str,
        args: Bytes,
        gas: u64,
        deposit: u128,
    ) -> Result<Value, Self::Error> {
        let params = call_function_params(&self.signer_id, contract, method_name, &args, gas, deposit);
        self.request(CALL_FUNCTION_METHOD, params).await
    }

    async fn submit_batch(
        &mut self,
        contract: &str,
        actions: Vec<FunctionCallAction>,
    ) -> Result<Value, Self::Error> {
        let params = sign_and_send_params(&self.signer_id, contract, &actions);
        self.request(SIGN_AND_SEND_METHOD, params).await
    }
}

#[async_trait]
impl AccountCreator for GatewayClient {
    type Error = RpcError;

    async fn create_account(
        &mut self,
        new_account_id: &str,
        parent_account_id: &str,
        initial_balance: u128,
    ) -> Result<Value, Self::Error> {
        let params = json!({
            "signer_id": parent_account_id,
            "new_account_id": new_account_id,
            "initial_balance": initial_balance.to_string(),
        });
        self.request(CREATE_ACCOUNT_METHOD, params).await
    }
}

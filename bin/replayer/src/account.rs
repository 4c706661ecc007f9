//! Bootstrapping and loading of the replaying account.

use crate::rpc::{GatewayClient, RpcError};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use replay_engine::{exponential_backoff, AccountCreator, BackoffPolicy, RetryExhausted};
use serde_json::Value;
use std::fmt::Display;
use tracing::info;

/// Read access to the access keys of target ledger accounts.
#[async_trait]
pub trait AccessKeyView {
    /// The transport error.
    type Error: Display + Send;

    /// Returns the access key of `account_id`.
    async fn view_access_key(&self, account_id: &str) -> Result<Value, Self::Error>;
}

#[async_trait]
impl AccessKeyView for GatewayClient {
    type Error = RpcError;

    async fn view_access_key(&self, account_id: &str) -> Result<Value, Self::Error> {
        Self::view_access_key(self, account_id).await
    }
}

/// Returns the parent of `account_id`, the account id without its first label.
pub fn parent_account_id(account_id: &str) -> Option<&str> {
    account_id.split_once('.').map(|(_, parent)| parent).filter(|parent| !parent.is_empty())
}

/// Creates `account_id` under its parent account, funded with `initial_balance`.
pub async fn create_account<C>(
    creator: &mut C,
    account_id: &str,
    initial_balance: u128,
) -> Result<Value>
where
    C: AccountCreator + Send,
{
    let parent = parent_account_id(account_id)
        .ok_or_else(|| anyhow!("account {account_id} has no parent account"))?;
    info!(target: "replayer", "creating account {account_id} under {parent}");
    creator
        .create_account(account_id, parent, initial_balance)
        .await
        .map_err(|e| anyhow!("Error creating account {account_id}: {e}"))
}

/// Loads the access key of `account_id`, retrying with exponential backoff.
pub async fn load_account<V>(
    view: &V,
    account_id: &str,
    policy: BackoffPolicy,
) -> Result<Value, RetryExhausted>
where
    V: AccessKeyView + Sync,
{
    let access_key = exponential_backoff(policy, || view.view_access_key(account_id)).await?;
    info!(target: "replayer", "loaded account {account_id}");
    Ok(access_key)
}

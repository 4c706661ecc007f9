//! Wires the source database, the ledger gateway and the replay engine into one run.

use crate::{
    account::{create_account, load_account, AccessKeyView},
    rpc::GatewayClient,
    ReplayCli,
};
use alloy_primitives::B256;
use anyhow::Result;
use replay_chain::{ChainIndex, ChainIndexer, DiskChainDb};
use replay_engine::{AccountCreator, LedgerClient, ReplayDriver, ReplaySummary};
use std::{path::Path, sync::Arc, time::Duration};
use tracing::info;

/// Runs a replay as configured on the command line.
///
/// Every parameter is validated before the database is opened or the gateway contacted.
pub async fn run(cfg: ReplayCli) -> Result<ReplaySummary> {
    let config = cfg.replay_config()?;
    let cursor = cfg.cursor()?;
    let genesis = cfg.read_genesis(config.network)?;

    let client =
        GatewayClient::new(&cfg.node_url, &cfg.account_id, Duration::from_secs(cfg.timeout))?;
    let mut driver = ReplayDriver::new(client, cfg.contract.clone(), config, cursor, genesis);
    replay(&cfg, &mut driver).await
}

/// Replays the source chain named by `cfg` through `driver`.
///
/// The source database is opened and indexed before the account is created or the validator
/// daemon set up, so a wrong head block leaves the ledger and the daemon home untouched.
///
/// ## Takes
/// - `cfg`: The command line of the run.
/// - `driver`: The [ReplayDriver] of the run, holding the gateway session.
///
/// ## Returns
/// - `Ok(ReplaySummary)`: The run completed.
/// - `Err(_)`: A parameter was invalid, the database could not be read, the setup failed or
///   the replay failed.
pub async fn replay<C>(cfg: &ReplayCli, driver: &mut ReplayDriver<C>) -> Result<ReplaySummary>
where
    C: LedgerClient + AccountCreator + AccessKeyView + Send + Sync,
{
    driver.validate()?;
    let policy = cfg.backoff_policy()?;
    let neard_config = if cfg.setup { Some(cfg.neard_config()?) } else { None };

    let (db, index) = open_database(&cfg.datadir, cfg.hash, cfg.block)?;

    let _neard = match neard_config {
        Some(neard_config) => {
            create_account(driver.client_mut(), &cfg.account_id, cfg.initial_balance).await?;
            Some(neard_config.setup()?)
        }
        None => None,
    };
    load_account(driver.client(), &cfg.account_id, policy).await?;

    let summary = driver.run(db, index.replay_range()).await?;
    Ok(summary)
}

/// Opens the chain stored in `datadir` and indexes it up to the head block.
///
/// ## Takes
/// - `datadir`: The directory of the source chain database.
/// - `head_hash`: The hash of the head block.
/// - `head_number`: The height of the head block.
///
/// ## Returns
/// - `Ok((db, index))`: The opened database and the [ChainIndex] of the head.
/// - `Err(_)`: The database could not be opened or a block of the ancestry is missing.
pub fn open_database(
    datadir: &Path,
    head_hash: B256,
    head_number: u64,
) -> Result<(Arc<DiskChainDb>, ChainIndex)> {
    let db = Arc::new(DiskChainDb::open_read_only(datadir)?);
    let index = ChainIndexer::new(db.as_ref()).index(head_hash, head_number)?;
    info!(
        target: "replayer",
        "replaying {} blocks and {} transactions",
        index.head_number + 1,
        index.transaction_count
    );
    Ok((db, index))
}

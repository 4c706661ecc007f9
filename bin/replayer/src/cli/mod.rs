//! This module contains all CLI-specific code for the replayer binary.

use crate::neard::NeardConfig;
use alloy_primitives::B256;
use anyhow::{anyhow, Result};
use clap::{
    builder::styling::{AnsiColor, Color, Style},
    ArgAction, Parser,
};
use replay_engine::{
    BackoffPolicy, ConfigError, GenesisConfig, Network, ReplayConfig, ReplayCursor,
    DEFAULT_BATCH_SIZE, DEFAULT_GAS,
};
use serde::Serialize;
use std::{path::PathBuf, time::Duration};

mod parser;
pub(crate) use parser::{parse_b256, parse_balance};

mod tracing_util;
pub use tracing_util::init_tracing_subscriber;

const ABOUT: &str = "
replayer reads the blocks of a source chain from its database and replays every transaction,
in order, as a call against a target contract on a NEAR style ledger. Runs can be resumed and
cut short at any (block, transaction) position.
";

/// The default 1000 NEAR funded into an account created with `--setup`.
const DEFAULT_INITIAL_BALANCE: &str = "1000000000000000000000000000";

/// The replayer CLI application arguments.
#[derive(Parser, Serialize, Clone, Debug)]
#[command(about = ABOUT, version, styles = cli_styles())]
pub struct ReplayCli {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count)]
    pub v: u8,
    /// Account of the target contract.
    pub contract: String,
    /// Account signing the submissions. Its key is held by the ledger gateway.
    #[clap(long, env = "REPLAYER_ACCOUNT_ID")]
    pub account_id: String,
    /// Height of the head block of the replay.
    #[clap(long)]
    pub block: u64,
    /// Hash of the head block of the replay.
    #[clap(long, value_parser = parse_b256)]
    pub hash: B256,
    /// Data directory containing the source chain database.
    #[clap(long, env = "REPLAYER_DATADIR")]
    pub datadir: PathBuf,
    /// Gas budget of a single submission.
    #[clap(long, default_value_t = DEFAULT_GAS)]
    pub gas: u64,
    /// URL of the JSON-RPC ledger gateway.
    #[clap(long, env = "REPLAYER_NODE_URL", default_value = "http://127.0.0.1:3030")]
    pub node_url: String,
    /// Timeout of a single gateway request, in seconds.
    #[clap(long, default_value_t = 30)]
    pub timeout: u64,
    /// Replay the Görli testnet.
    #[clap(long)]
    pub goerli: bool,
    /// Replay the Rinkeby testnet.
    #[clap(long)]
    pub rinkeby: bool,
    /// Replay the Ropsten testnet.
    #[clap(long)]
    pub ropsten: bool,
    /// Path to the geth `genesis.json` of the network, whose allocation bootstraps the target
    /// contract.
    #[clap(long)]
    pub genesis: Option<PathBuf>,
    /// Skip the begin-block call of blocks without transactions.
    #[clap(long)]
    pub skip: bool,
    /// Group submissions into batched transactions.
    #[clap(long)]
    pub batch: bool,
    /// Number of submissions per batched transaction.
    #[clap(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// First block to replay.
    #[clap(long, default_value_t = 0)]
    pub start_block: u64,
    /// First transaction of the start block to replay.
    #[clap(long, default_value_t = 0)]
    pub start_tx: u64,
    /// Block to stop at, 0 to replay up to the head.
    #[clap(long, default_value_t = 0)]
    pub break_block: u64,
    /// Transaction of the break block to stop at. With 0, the break block is not replayed.
    #[clap(long, default_value_t = 0)]
    pub break_tx: u64,
    /// Wait before retrying a failed account lookup, in milliseconds.
    #[clap(long, default_value_t = 500)]
    pub retry_wait: u64,
    /// Number of account lookup attempts.
    #[clap(long, default_value_t = 5)]
    pub retries: u32,
    /// Growth of the wait between account lookup attempts.
    #[clap(long, default_value_t = 2.0)]
    pub retry_factor: f64,
    /// Create the account and set up a local validator daemon before replaying.
    #[clap(long)]
    pub setup: bool,
    /// Build the validator daemon in release mode.
    #[clap(long, requires = "setup")]
    pub release: bool,
    /// Balance of the account created with `--setup`, in yoctoNEAR.
    #[clap(long, value_parser = parse_balance, default_value = DEFAULT_INITIAL_BALANCE)]
    pub initial_balance: u128,
    /// Source checkout of the validator daemon.
    #[clap(long, default_value = "../nearcore")]
    pub nearcore_dir: PathBuf,
    /// Home directory of the validator daemon.
    #[clap(long, required_if_eq("setup", "true"))]
    pub near_home: Option<PathBuf>,
}

impl ReplayCli {
    /// Returns the selected [Network].
    pub fn network(&self) -> Result<Network, ConfigError> {
        Network::from_flags(self.goerli, self.rinkeby, self.ropsten)
    }

    /// Returns the [ReplayConfig] of the run.
    pub fn replay_config(&self) -> Result<ReplayConfig, ConfigError> {
        if self.account_id.is_empty() {
            return Err(ConfigError::Missing("account-id"));
        }
        if self.contract.is_empty() {
            return Err(ConfigError::Missing("contract"));
        }
        let network = self.network()?;
        let config = ReplayConfig {
            gas: self.gas,
            batch_size: self.batch_size,
            skip_empty_blocks: self.skip,
            batch: self.batch,
            network,
            chain_id: network.chain_id(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns the [ReplayCursor] of the run.
    pub fn cursor(&self) -> Result<ReplayCursor, ConfigError> {
        let cursor = ReplayCursor::starting_at(self.start_block, self.start_tx)
            .with_break(self.break_block, self.break_tx);
        cursor.validate()?;
        Ok(cursor)
    }

    /// Returns the [BackoffPolicy] of the account lookup.
    pub fn backoff_policy(&self) -> Result<BackoffPolicy, ConfigError> {
        let policy = BackoffPolicy {
            initial_wait: Duration::from_millis(self.retry_wait),
            retries: self.retries,
            factor: self.retry_factor,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Reads the [GenesisConfig] of the network from `--genesis`.
    pub fn read_genesis(&self, network: Network) -> Result<GenesisConfig> {
        let path = self.genesis.as_ref().ok_or(ConfigError::Missing("genesis"))?;
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Error reading genesis file {}: {e}", path.display()))?;
        Ok(GenesisConfig::from_geth_json(network, &json)?)
    }

    /// Returns the [NeardConfig] used by `--setup`.
    pub fn neard_config(&self) -> Result<NeardConfig, ConfigError> {
        let home_dir = self.near_home.clone().ok_or(ConfigError::Missing("near-home"))?;
        Ok(NeardConfig {
            source_dir: self.nearcore_dir.clone(),
            home_dir,
            release: self.release,
        })
    }
}

/// Styles for the CLI application.
const fn cli_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .header(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}

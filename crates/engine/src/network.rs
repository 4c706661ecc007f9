//! Source networks and the argument payloads of the bootstrap and begin-block steps.

use crate::ConfigError;
use alloy_primitives::{b256, Address, B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use replay_chain::Block;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// A source network that can be replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// The Görli test network.
    Goerli,
    /// The Rinkeby test network.
    Rinkeby,
    /// The Ropsten test network.
    Ropsten,
}

impl Network {
    /// Returns the chain id of the network.
    pub const fn chain_id(&self) -> u64 {
        match self {
            Self::Goerli => 5,
            Self::Rinkeby => 4,
            Self::Ropsten => 3,
        }
    }

    /// Returns the hash of the genesis block of the network.
    pub const fn genesis_hash(&self) -> B256 {
        match self {
            Self::Goerli => {
                b256!("bf7e331f7f7c1dd2e05159666b3bf8bc7a8a3a9eb1d518969eab529dd9b88c1a")
            }
            Self::Rinkeby => {
                b256!("6341fd3daf94b748c72ced5a5b26028f2474f5f00d824504e4fa37a75767e177")
            }
            Self::Ropsten => {
                b256!("41941023680923e0fe4d74a34bdac8141f2540e3ae90623718e47d66d1ca4a2d")
            }
        }
    }

    /// Returns the lowercase name of the network.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Goerli => "goerli",
            Self::Rinkeby => "rinkeby",
            Self::Ropsten => "ropsten",
        }
    }

    /// Selects the network from mutually exclusive flags.
    pub fn from_flags(goerli: bool, rinkeby: bool, ropsten: bool) -> Result<Self, ConfigError> {
        let selected = [(goerli, Self::Goerli), (rinkeby, Self::Rinkeby), (ropsten, Self::Ropsten)]
            .into_iter()
            .filter_map(|(set, network)| set.then_some(network))
            .collect::<Vec<_>>();
        match selected.as_slice() {
            [] => Err(ConfigError::MissingNetwork),
            [network] => Ok(*network),
            [first, second, ..] => Err(ConfigError::ConflictingNetworks(*first, *second)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The balance of one account in the genesis allocation.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct AccountBalance {
    /// The funded account.
    pub address: Address,
    /// Its balance in wei.
    pub balance: U256,
}

/// The arguments of the bootstrap step.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BeginChainArgs {
    /// The chain id of the source network.
    pub chain_id: U256,
    /// The genesis allocation, ordered by address.
    pub genesis_alloc: Vec<AccountBalance>,
}

/// The block context passed to the target contract before the transactions of a block.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BeginBlockArgs {
    /// Hash of the block.
    pub hash: B256,
    /// Beneficiary of the block.
    pub coinbase: Address,
    /// Block timestamp.
    pub timestamp: U256,
    /// Block height.
    pub number: U256,
    /// Block difficulty.
    pub difficulty: U256,
    /// Block gas limit.
    pub gas_limit: U256,
}

impl From<&Block> for BeginBlockArgs {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash(),
            coinbase: block.header.beneficiary,
            timestamp: U256::from(block.timestamp()),
            number: U256::from(block.number()),
            difficulty: block.header.difficulty,
            gas_limit: U256::from(block.header.gas_limit),
        }
    }
}

/// The genesis state the target contract is bootstrapped with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisConfig {
    /// The source network.
    pub network: Network,
    /// Genesis balances keyed by account.
    pub alloc: BTreeMap<Address, U256>,
}

/// The subset of a geth `genesis.json` read by [GenesisConfig::from_geth_json].
#[derive(Debug, Deserialize)]
struct GethGenesis {
    #[serde(default)]
    config: Option<GethChainConfig>,
    #[serde(default)]
    alloc: BTreeMap<String, GethAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GethChainConfig {
    chain_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GethAccount {
    balance: String,
}

impl GenesisConfig {
    /// Creates a [GenesisConfig] with an empty allocation, to be filled with
    /// [GenesisConfig::with_balance].
    pub const fn new(network: Network) -> Self {
        Self { network, alloc: BTreeMap::new() }
    }

    /// Adds a genesis balance.
    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.alloc.insert(address, balance);
        self
    }

    /// Reads the allocation of a geth style `genesis.json`.
    ///
    /// ## Takes
    /// - `network`: The network the genesis file belongs to.
    /// - `json`: The contents of the genesis file.
    ///
    /// ## Returns
    /// - `Ok(GenesisConfig)`: The genesis allocation.
    /// - `Err(ConfigError::Genesis)`: The file is malformed, belongs to another chain or funds
    ///   no account.
    pub fn from_geth_json(network: Network, json: &str) -> Result<Self, ConfigError> {
        let genesis: GethGenesis =
            serde_json::from_str(json).map_err(|e| ConfigError::Genesis(e.to_string()))?;

        if let Some(chain_id) = genesis.config.and_then(|config| config.chain_id) {
            if chain_id != network.chain_id() {
                return Err(ConfigError::Genesis(format!(
                    "genesis chain id {chain_id} does not match network {network}"
                )));
            }
        }

        let mut alloc = BTreeMap::new();
        for (address, account) in genesis.alloc {
            let address = Address::from_str(&address)
                .map_err(|e| ConfigError::Genesis(format!("invalid address {address}: {e}")))?;
            let balance = U256::from_str(&account.balance).map_err(|e| {
                ConfigError::Genesis(format!("invalid balance of {address}: {e}"))
            })?;
            alloc.insert(address, balance);
        }
        if alloc.is_empty() {
            return Err(ConfigError::Genesis(format!("genesis of {network} funds no account")));
        }
        Ok(Self { network, alloc })
    }

    /// Returns the arguments of the bootstrap step.
    pub fn begin_chain_args(&self) -> BeginChainArgs {
        BeginChainArgs {
            chain_id: U256::from(self.network.chain_id()),
            genesis_alloc: self
                .alloc
                .iter()
                .map(|(address, balance)| AccountBalance { address: *address, balance: *balance })
                .collect(),
        }
    }
}

// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scanner configuration and the pool registry.

use std::{collections::HashSet, path::Path};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use url::Url;

use crate::{errors::CodedError, impl_coded_debug, units::MAX_DECIMALS};

mod defaults {
    pub const fn timeout_secs() -> u64 {
        30
    }

    pub const fn decimals() -> u8 {
        18
    }

    pub fn symbol() -> String {
        "ZIL".to_string()
    }

    /// Legacy amounts are denominated in Qa.
    pub const fn legacy_decimals() -> u8 {
        12
    }
}

#[derive(Error)]
pub enum ConfigErr {
    #[error("pool {0} is listed more than once")]
    DuplicatePool(Address),

    #[error("cycle-based pool {0} needs registry.legacy_contract")]
    MissingLegacyContract(String),

    #[error("{name} uses {decimals} decimals, at most {max} are supported", max = MAX_DECIMALS)]
    UnsupportedDecimals { name: String, decimals: u8 },
}

impl_coded_debug!(ConfigErr);

impl CodedError for ConfigErr {
    fn code(&self) -> &str {
        match self {
            ConfigErr::DuplicatePool(_) => "[S-CFG-001]",
            ConfigErr::MissingLegacyContract(_) => "[S-CFG-002]",
            ConfigErr::UnsupportedDecimals { .. } => "[S-CFG-003]",
        }
    }
}

/// Accounting model a pool follows on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingModel {
    /// Legacy model, rewards prorated per cycle and read from raw contract state.
    CycleBased,
    /// Delegation contract exposing view functions.
    PoolContract,
}

/// Dispatch tag used by the query builder and aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Cycle,
    Delegator,
    Liquid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,
    pub address: Address,
    /// Liquid staking token, only set for liquid pools
    #[serde(default)]
    pub token: Option<Address>,
    pub model: AccountingModel,
    #[serde(default = "defaults::decimals")]
    pub decimals: u8,
    #[serde(default = "defaults::symbol")]
    pub symbol: String,
}

impl Pool {
    /// Unlisted pool of the legacy contract, found through the account's deposits.
    pub fn cycle_based(address: Address, decimals: u8) -> Self {
        Self {
            name: String::new(),
            address,
            token: None,
            model: AccountingModel::CycleBased,
            decimals,
            symbol: defaults::symbol(),
        }
    }

    pub fn kind(&self) -> PoolKind {
        match (self.model, self.token) {
            (AccountingModel::CycleBased, _) => PoolKind::Cycle,
            (AccountingModel::PoolContract, None) => PoolKind::Delegator,
            (AccountingModel::PoolContract, Some(_)) => PoolKind::Liquid,
        }
    }
}

/// Immutable set of pools and network contracts a scan runs against.
///
/// Cycle-based pools do not have to be listed: when `legacy_contract` is set, every pool the
/// account delegated to there is discovered from its deposits. Listing one only overrides
/// its name, decimals or symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    /// Legacy staking contract holding the state of every cycle-based pool
    #[serde(default)]
    pub legacy_contract: Option<Address>,
    /// Decimals of unlisted cycle-based pools
    #[serde(default = "defaults::legacy_decimals")]
    pub legacy_decimals: u8,
    /// Deposit contract reporting total network stake
    #[serde(default)]
    pub deposit_contract: Option<Address>,
    /// Network-wide staking emission per year, in whole tokens
    #[serde(default)]
    pub annual_emission: Option<f64>,
    #[serde(default)]
    pub pools: Vec<Pool>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            legacy_contract: None,
            legacy_decimals: defaults::legacy_decimals(),
            deposit_contract: None,
            annual_emission: None,
            pools: Vec::new(),
        }
    }
}

impl Registry {
    pub fn pool(&self, address: &Address) -> Option<&Pool> {
        self.pools.iter().find(|pool| pool.address == *address)
    }

    pub fn validate(&self) -> Result<(), ConfigErr> {
        if self.legacy_decimals > MAX_DECIMALS {
            return Err(ConfigErr::UnsupportedDecimals {
                name: "registry.legacy_decimals".to_string(),
                decimals: self.legacy_decimals,
            });
        }
        let mut seen = HashSet::new();
        for pool in &self.pools {
            if pool.decimals > MAX_DECIMALS {
                return Err(ConfigErr::UnsupportedDecimals {
                    name: pool.name.clone(),
                    decimals: pool.decimals,
                });
            }
            if !seen.insert(pool.address) {
                return Err(ConfigErr::DuplicatePool(pool.address));
            }
            if pool.kind() == PoolKind::Cycle && self.legacy_contract.is_none() {
                return Err(ConfigErr::MissingLegacyContract(pool.name.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: Url,
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub registry: Registry,
}

impl Config {
    /// Load the config from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .await
            .context(format!("Failed to read config file from {path:?}"))?;
        let config: Self =
            toml::from_str(&data).context(format!("Failed to parse toml file from {path:?}"))?;
        config.registry.validate().context("Invalid pool registry")?;
        Ok(config)
    }
}

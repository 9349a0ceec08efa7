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

//! Merges decoded positions into one sorted, totalled record set.

use std::{cmp::Ordering, collections::BTreeMap};

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::{
    config::{Pool, PoolKind},
    contracts::PendingClaim,
    units::{self, normalize},
};

/// Statistics of the pool a position sits in. Every field is best effort and omitted
/// when its inputs were unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "units::decimal_opt")]
    pub pool_stake: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Commission fraction from the numerator and denominator a pool contract reports.
pub fn commission_fraction(numerator: U256, denominator: U256) -> Option<f64> {
    if denominator.is_zero() {
        return None;
    }
    Some(units::to_tokens(numerator, 0) / units::to_tokens(denominator, 0))
}

impl PoolStats {
    /// Derives vote power and APR for a pool-contract pool.
    ///
    /// `vote_power = pool_stake / network_stake` and
    /// `apr = vote_power * annual_emission * (1 - commission) / pool_stake_in_tokens`.
    /// The APR is an estimate and depends on the configured emission figure.
    pub fn derive(
        pool_stake: Option<U256>,
        network_stake: Option<U256>,
        commission: Option<f64>,
        decimals: u8,
        annual_emission: Option<f64>,
    ) -> Self {
        let vote_power = match (pool_stake, network_stake) {
            (Some(pool), Some(network)) if !network.is_zero() => {
                Some(units::to_tokens(pool, 0) / units::to_tokens(network, 0))
            }
            _ => None,
        };
        let apr = match (vote_power, commission, pool_stake, annual_emission) {
            (Some(vote_power), Some(commission), Some(pool), Some(emission))
                if !pool.is_zero() =>
            {
                Some(vote_power * emission * (1.0 - commission) / units::to_tokens(pool, decimals))
            }
            _ => None,
        };
        Self { pool_stake, commission, vote_power, apr, active: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelegationPosition {
    pub name: String,
    pub pool: Address,
    pub kind: PoolKind,
    pub symbol: String,
    pub decimals: u8,
    #[serde(serialize_with = "units::decimal")]
    pub staked: U256,
    #[serde(serialize_with = "units::decimal")]
    pub reward: U256,
    #[serde(serialize_with = "units::decimal")]
    pub claimable: U256,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending_claims: Vec<PendingClaim>,
    pub stats: PoolStats,
}

impl DelegationPosition {
    pub fn new(pool: &Pool) -> Self {
        Self {
            name: pool.name.clone(),
            pool: pool.address,
            kind: pool.kind(),
            symbol: pool.symbol.clone(),
            decimals: pool.decimals,
            staked: U256::ZERO,
            reward: U256::ZERO,
            claimable: U256::ZERO,
            pending_claims: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    /// True when the account holds nothing in this pool.
    pub fn is_empty(&self) -> bool {
        self.staked.is_zero()
            && self.reward.is_zero()
            && self.claimable.is_zero()
            && self.pending_claims.iter().all(|claim| claim.amount.is_zero())
    }

    pub fn normalized_stake(&self) -> U256 {
        normalize(self.staked, self.decimals)
    }
}

/// Staked amount descending, then name and address ascending.
pub fn position_order(a: &DelegationPosition, b: &DelegationPosition) -> Ordering {
    b.normalized_stake()
        .cmp(&a.normalized_stake())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.pool.cmp(&b.pool))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountPositions {
    pub account: Address,
    pub positions: Vec<DelegationPosition>,
    /// Sum of staked amounts, normalized to 18 decimals
    #[serde(serialize_with = "units::decimal")]
    pub total_staked: U256,
    /// Sum of unclaimed rewards, normalized to 18 decimals
    #[serde(serialize_with = "units::decimal")]
    pub total_rewards: U256,
}

/// Collects positions of one account, at most one per pool.
#[derive(Debug, Default)]
pub struct Aggregator {
    positions: BTreeMap<Address, DelegationPosition>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a position. A second position for the same pool is dropped.
    pub fn insert(&mut self, position: DelegationPosition) -> bool {
        if self.positions.contains_key(&position.pool) {
            tracing::warn!("Dropping duplicate position for pool {}", position.pool);
            return false;
        }
        self.positions.insert(position.pool, position);
        true
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn finish(self, account: Address) -> AccountPositions {
        let mut positions: Vec<DelegationPosition> =
            self.positions.into_values().filter(|position| !position.is_empty()).collect();
        positions.sort_by(position_order);

        let (total_staked, total_rewards) =
            positions.iter().fold((U256::ZERO, U256::ZERO), |(staked, reward), position| {
                (
                    staked.saturating_add(position.normalized_stake()),
                    reward.saturating_add(normalize(position.reward, position.decimals)),
                )
            });

        AccountPositions { account, positions, total_staked, total_rewards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountingModel;

    fn pool(name: &str, byte: u8, decimals: u8) -> Pool {
        Pool {
            name: name.into(),
            address: Address::repeat_byte(byte),
            token: None,
            model: AccountingModel::PoolContract,
            decimals,
            symbol: "ZIL".into(),
        }
    }

    fn position(name: &str, byte: u8, decimals: u8, staked: u64) -> DelegationPosition {
        let mut position = DelegationPosition::new(&pool(name, byte, decimals));
        position.staked = U256::from(staked);
        position
    }

    #[test]
    fn sorts_by_stake_then_name() {
        let mut aggregator = Aggregator::new();
        aggregator.insert(position("beta", 1, 18, 500));
        aggregator.insert(position("alpha", 2, 18, 500));
        aggregator.insert(position("gamma", 3, 18, 900));
        // 1 unit at 12 decimals outweighs 900 at 18
        aggregator.insert(position("legacy", 4, 12, 1));

        let result = aggregator.finish(Address::ZERO);
        let names: Vec<&str> = result.positions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["legacy", "gamma", "alpha", "beta"]);
        assert_eq!(result.total_staked, U256::from(1_000_000u64 + 1900));
    }

    #[test]
    fn drops_empty_positions_but_keeps_pending_withdrawals() {
        let mut aggregator = Aggregator::new();
        aggregator.insert(position("empty", 1, 18, 0));

        let mut unbonding = position("unbonding", 2, 18, 0);
        unbonding.pending_claims.push(PendingClaim {
            unlock_block: U256::from(100u64),
            amount: U256::from(3u64),
        });
        aggregator.insert(unbonding);

        let mut rewarded = position("rewarded", 3, 18, 0);
        rewarded.reward = U256::from(9u64);
        aggregator.insert(rewarded);

        let result = aggregator.finish(Address::ZERO);
        let names: Vec<&str> = result.positions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["rewarded", "unbonding"]);
        assert_eq!(result.total_rewards, U256::from(9u64));
    }

    #[test]
    fn never_emits_a_pool_twice() {
        let mut aggregator = Aggregator::new();
        assert!(aggregator.insert(position("a", 1, 18, 5)));
        assert!(!aggregator.insert(position("a again", 1, 18, 50)));
        let result = aggregator.finish(Address::ZERO);
        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.positions[0].staked, U256::from(5u64));
    }

    #[test]
    fn output_is_byte_identical_across_runs() {
        let run = || {
            let mut aggregator = Aggregator::new();
            for (i, stake) in [7u64, 3, 7, 11, 0, 3].into_iter().enumerate() {
                aggregator.insert(position(&format!("pool-{}", i % 3), i as u8 + 1, 18, stake));
            }
            serde_json::to_vec(&aggregator.finish(Address::repeat_byte(0xee))).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn derives_vote_power_and_apr() {
        let ten_m = U256::from(10_000_000u64) * U256::from(10u64).pow(U256::from(18u64));
        let hundred_m = U256::from(100_000_000u64) * U256::from(10u64).pow(U256::from(18u64));
        let stats =
            PoolStats::derive(Some(ten_m), Some(hundred_m), Some(0.1), 18, Some(1_000_000.0));
        assert!((stats.vote_power.unwrap() - 0.1).abs() < 1e-12);
        // 0.1 * 1_000_000 * 0.9 / 10_000_000
        assert!((stats.apr.unwrap() - 0.009).abs() < 1e-12);
    }

    #[test]
    fn missing_inputs_omit_derived_fields() {
        let stats = PoolStats::derive(Some(U256::from(10u64)), None, Some(0.1), 18, Some(1.0));
        assert_eq!(stats.vote_power, None);
        assert_eq!(stats.apr, None);

        let stats = PoolStats::derive(
            Some(U256::from(10u64)),
            Some(U256::from(100u64)),
            None,
            18,
            Some(1.0),
        );
        assert!(stats.vote_power.is_some());
        assert_eq!(stats.apr, None);

        let json = serde_json::to_value(&PoolStats::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));

        assert_eq!(commission_fraction(U256::from(1u64), U256::ZERO), None);
        assert_eq!(commission_fraction(U256::from(1u64), U256::from(4u64)), Some(0.25));
    }
}

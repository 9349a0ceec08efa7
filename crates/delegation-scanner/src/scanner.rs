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

//! The two-phase scan of one account.
//!
//! Phase 1 asks every pool contract whether the account holds anything there. In the same
//! round trip it reads the account's legacy deposits and withdrawal cycles, which name every
//! cycle-based pool the account delegated to, listed in the registry or not. Phase 2 only
//! runs for cycle-based pools with a stake and unclaimed cycles and pulls the per-cycle
//! deposit data the reward calculation needs.

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::{
    address::{normalize_account, state_key},
    aggregate::{commission_fraction, AccountPositions, Aggregator, DelegationPosition, PoolStats},
    config::{Pool, PoolKind, Registry},
    contracts::{CallValue, ViewCall},
    correlate::{correlate, Correlated},
    decode::{
        call_amount, call_value, cycle_amounts, cycle_totals, pool_amounts, pool_info, state_entry,
    },
    errors::ScanError,
    query::{Lookup, LookupKind, QueryBatch, QueryBuilder, StateField, Target},
    reward::compute_reward,
    rpc::BatchTransport,
};

const STATE_OFFSET: u64 = 1;

const LEGACY_DISCOVERY: [StateField; 4] = [
    StateField::LastRewardCycle,
    StateField::DepositAmount,
    StateField::LastWithdrawCycle,
    StateField::PoolInfo,
];

const CYCLE_DETAIL: [StateField; 4] = [
    StateField::DirectDeposits,
    StateField::BufferedDeposits,
    StateField::StakePerCycle,
    StateField::CycleTotals,
];

const DELEGATOR_CALLS: [ViewCall; 6] = [
    ViewCall::DelegatedAmount,
    ViewCall::Rewards,
    ViewCall::Claimable,
    ViewCall::PendingClaims,
    ViewCall::PoolStake,
    ViewCall::Commission,
];

const LIQUID_CALLS: [ViewCall; 5] = [
    ViewCall::TokenBalance,
    ViewCall::Claimable,
    ViewCall::PendingClaims,
    ViewCall::PoolStake,
    ViewCall::Commission,
];

/// Account-wide lookup of a legacy contract field.
fn legacy_lookup(field: StateField) -> Lookup {
    Lookup::network(LookupKind::State(field))
}

fn network_stake_lookup() -> Lookup {
    Lookup::network(LookupKind::Call(ViewCall::NetworkStake))
}

/// A cycle-based position waiting for its reward.
struct PendingReward {
    position: DelegationPosition,
    last_withdraw_cycle: u64,
}

/// Scans accounts against one registry through one transport.
pub struct StakeScanner<T> {
    transport: T,
    registry: Arc<Registry>,
}

impl<T: BatchTransport> StakeScanner<T> {
    /// Fails when the registry contains duplicate pools or cycle-based pools without a
    /// legacy contract.
    pub fn new(transport: T, registry: Arc<Registry>) -> Result<Self, ScanError> {
        registry.validate()?;
        Ok(Self { transport, registry })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scans an account given as a hex string, with or without `0x`.
    pub async fn scan(&self, account: &str) -> Result<AccountPositions, ScanError> {
        let account = normalize_account(account)?;
        self.scan_address(account).await
    }

    pub async fn scan_address(&self, account: Address) -> Result<AccountPositions, ScanError> {
        let (discovery, next_id) = self.discovery_batch(account)?;
        tracing::info!(
            "Scanning {account} across {} pools, discovery batch of {} lookups",
            self.registry.pools.len(),
            discovery.len()
        );
        let discovered = self.round_trip(&discovery).await?;

        let mut aggregator = Aggregator::new();
        let network_stake =
            call_amount(discovered.get(&network_stake_lookup()), ViewCall::NetworkStake);
        for pool in &self.registry.pools {
            let position = match pool.kind() {
                PoolKind::Cycle => continue,
                PoolKind::Delegator | PoolKind::Liquid => {
                    self.call_position(pool, &discovered, network_stake)
                }
            };
            if let Some(position) = position {
                aggregator.insert(position);
            }
        }

        let legacy = |field: StateField| {
            state_entry(discovered.get(&legacy_lookup(field)), field, &account, &Target::Network)
        };
        let last_reward_cycle = legacy(StateField::LastRewardCycle).cycle();
        let pending: Vec<PendingReward> = pool_amounts(legacy(StateField::DepositAmount))
            .into_iter()
            .filter_map(|(pool, staked)| self.cycle_position(pool, staked, account, &discovered))
            .collect();

        let mut detail = QueryBuilder::new(&self.registry, account, next_id);
        for entry in &pending {
            if entry.last_withdraw_cycle < last_reward_cycle {
                detail.extend(
                    CYCLE_DETAIL.iter().map(|field| Lookup::state(entry.position.pool, *field)),
                )?;
            }
        }
        let detail = detail.finish();

        let details = if detail.is_empty() {
            tracing::info!("No cycle-based pool has unclaimed cycles, skipping detail batch");
            Correlated::default()
        } else {
            tracing::info!("Detail batch of {} lookups", detail.len());
            self.round_trip(&detail).await?
        };

        for PendingReward { mut position, last_withdraw_cycle } in pending {
            position.reward = unclaimed_reward(
                account,
                &position,
                last_withdraw_cycle,
                last_reward_cycle,
                &details,
            );
            aggregator.insert(position);
        }

        let positions = aggregator.finish(account);
        tracing::info!(
            "Found {} positions for {account}, total staked {}",
            positions.positions.len(),
            positions.total_staked
        );
        Ok(positions)
    }

    /// Builds phase 1 and returns it with the first id left free for phase 2.
    fn discovery_batch(&self, account: Address) -> Result<(QueryBatch, u64), ScanError> {
        let registry = self.registry.as_ref();

        let mut state = QueryBuilder::new(registry, account, STATE_OFFSET);
        if registry.legacy_contract.is_some() {
            state.extend(LEGACY_DISCOVERY.iter().map(|field| legacy_lookup(*field)))?;
        }

        let mut calls = QueryBuilder::new(registry, account, state.next_id());
        let mut has_call_pools = false;
        for pool in &registry.pools {
            let lookups: &[ViewCall] = match pool.kind() {
                PoolKind::Cycle => continue,
                PoolKind::Delegator => &DELEGATOR_CALLS,
                PoolKind::Liquid => &LIQUID_CALLS,
            };
            has_call_pools = true;
            calls.extend(lookups.iter().map(|call| Lookup::call(pool.address, *call)))?;
        }
        if has_call_pools && registry.deposit_contract.is_some() {
            calls.push(network_stake_lookup())?;
        }

        let next_id = calls.next_id();
        Ok((state.finish().concat(calls.finish())?, next_id))
    }

    async fn round_trip(&self, batch: &QueryBatch) -> Result<Correlated, ScanError> {
        let responses = self.transport.send_batch(&batch.requests).await?;
        let correlated = correlate(&batch.table, responses);
        tracing::debug!(
            "{} of {} lookups answered",
            correlated.present_count(),
            correlated.len()
        );
        Ok(correlated)
    }

    /// Phase 1 view of a cycle-based pool the account holds `staked` in. The account-wide
    /// payloads answer per-pool paths.
    fn cycle_position(
        &self,
        address: Address,
        staked: U256,
        account: Address,
        discovered: &Correlated,
    ) -> Option<PendingReward> {
        if staked.is_zero() {
            return None;
        }
        let pool = match self.registry.pool(&address) {
            Some(pool) if pool.kind() == PoolKind::Cycle => pool.clone(),
            Some(pool) => {
                tracing::warn!(
                    "Legacy deposit found in {} ({address}), which is listed as a pool contract",
                    pool.name
                );
                return None;
            }
            None => {
                tracing::debug!("Found unlisted cycle-based pool {address}");
                Pool::cycle_based(address, self.registry.legacy_decimals)
            }
        };

        let target = Target::Pool(address);
        let entry = |field: StateField| {
            state_entry(discovered.get(&legacy_lookup(field)), field, &account, &target)
        };

        let mut position = DelegationPosition::new(&pool);
        position.staked = staked;
        if let Some(info) = pool_info(entry(StateField::PoolInfo)) {
            if position.name.is_empty() {
                position.name = info.name.unwrap_or_default();
            }
            position.stats = PoolStats {
                pool_stake: Some(info.stake),
                commission: info.commission,
                active: Some(info.active),
                ..PoolStats::default()
            };
        }
        if position.name.is_empty() {
            position.name = state_key(&address);
        }

        Some(PendingReward {
            position,
            last_withdraw_cycle: entry(StateField::LastWithdrawCycle).cycle(),
        })
    }

    fn call_position(
        &self,
        pool: &Pool,
        discovered: &Correlated,
        network_stake: Option<U256>,
    ) -> Option<DelegationPosition> {
        let slot = |call: ViewCall| discovered.get(&Lookup::call(pool.address, call));

        let (stake_call, reward) = match pool.kind() {
            PoolKind::Liquid => (ViewCall::TokenBalance, U256::ZERO),
            _ => (
                ViewCall::DelegatedAmount,
                call_amount(slot(ViewCall::Rewards), ViewCall::Rewards).unwrap_or_default(),
            ),
        };
        let Some(staked) = call_amount(slot(stake_call), stake_call) else {
            tracing::debug!("No stake reported by {} ({}), skipping", pool.name, pool.address);
            return None;
        };

        let mut position = DelegationPosition::new(pool);
        position.staked = staked;
        position.reward = reward;
        position.claimable =
            call_amount(slot(ViewCall::Claimable), ViewCall::Claimable).unwrap_or_default();
        if let Some(CallValue::PendingClaims(claims)) =
            call_value(slot(ViewCall::PendingClaims), ViewCall::PendingClaims)
        {
            position.pending_claims = claims;
        }

        let commission = match call_value(slot(ViewCall::Commission), ViewCall::Commission) {
            Some(CallValue::Commission { numerator, denominator }) => {
                commission_fraction(numerator, denominator)
            }
            _ => None,
        };
        position.stats = PoolStats::derive(
            call_amount(slot(ViewCall::PoolStake), ViewCall::PoolStake),
            network_stake,
            commission,
            pool.decimals,
            self.registry.annual_emission,
        );
        Some(position)
    }
}

fn unclaimed_reward(
    account: Address,
    position: &DelegationPosition,
    last_withdraw_cycle: u64,
    last_reward_cycle: u64,
    details: &Correlated,
) -> U256 {
    let target = Target::Pool(position.pool);
    let entry = |field: StateField| {
        state_entry(details.get(&Lookup::state(position.pool, field)), field, &account, &target)
    };

    compute_reward(
        last_withdraw_cycle,
        last_reward_cycle,
        &cycle_amounts(entry(StateField::DirectDeposits)),
        &cycle_amounts(entry(StateField::BufferedDeposits)),
        &cycle_amounts(entry(StateField::StakePerCycle)),
        &cycle_totals(entry(StateField::CycleTotals)),
    )
}

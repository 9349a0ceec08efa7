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

//! Cycle-prorated reward accrual for cycle-based pools.
//!
//! Rewards are split per cycle in proportion to the delegator's effective stake in that
//! cycle, with the same truncating integer division the staking contract applies. A
//! direct deposit made during cycle `c - 1` is effective from cycle `c`; a buffered
//! deposit needs one cycle longer and is effective from `c + 1`.

use std::{collections::BTreeMap, ops::RangeInclusive};

use alloy::primitives::U256;
use num_bigint::BigUint;

/// Per-cycle amounts keyed by cycle number.
pub type CycleAmounts = BTreeMap<u64, U256>;

/// Pool-wide bookkeeping for one reward cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTotal {
    pub total_stake: U256,
    pub total_reward: U256,
}

/// Cycles whose rewards have not been withdrawn yet, `(last_withdraw, last_reward]`.
pub fn needed_cycles(last_withdraw_cycle: u64, last_reward_cycle: u64) -> RangeInclusive<u64> {
    if last_reward_cycle <= last_withdraw_cycle {
        return 1..=0;
    }
    (last_withdraw_cycle + 1)..=last_reward_cycle
}

fn at(map: &CycleAmounts, cycle: Option<u64>) -> U256 {
    cycle.and_then(|cycle| map.get(&cycle)).copied().unwrap_or(U256::ZERO)
}

/// Effective delegated stake for every cycle in `range`.
///
/// `effective[c] = effective[c - 1] + direct[c - 1] + buffered[c - 2]` with
/// `effective[0] = 0`, except that a cycle with a recorded historical snapshot takes the
/// snapshot as its effective stake. Cycles below the range are folded in but not returned.
pub fn effective_stakes(
    range: RangeInclusive<u64>,
    direct: &CycleAmounts,
    buffered: &CycleAmounts,
    historical: &CycleAmounts,
) -> CycleAmounts {
    let mut result = CycleAmounts::new();
    if range.is_empty() {
        return result;
    }
    let (first, last) = (*range.start(), *range.end());

    // Stake is zero until the first cycle any input can touch.
    let start = [
        direct.keys().next().map(|c| c.saturating_add(1)),
        buffered.keys().next().map(|c| c.saturating_add(2)),
        historical.keys().next().copied(),
    ]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(u64::MAX)
    .max(1);

    let mut effective = U256::ZERO;
    for cycle in start.min(first)..=last {
        effective = match historical.get(&cycle) {
            Some(snapshot) => *snapshot,
            None => effective
                .saturating_add(at(direct, cycle.checked_sub(1)))
                .saturating_add(at(buffered, cycle.checked_sub(2))),
        };
        if cycle >= first {
            result.insert(cycle, effective);
        }
    }
    result
}

/// `floor(effective * total_reward / total_stake)`, zero when nothing was staked.
pub fn cycle_reward(effective: U256, total: &CycleTotal) -> U256 {
    if total.total_stake.is_zero() {
        return U256::ZERO;
    }
    match effective.checked_mul(total.total_reward) {
        Some(product) => product / total.total_stake,
        None => {
            let wide = |value: U256| BigUint::from_bytes_be(&value.to_be_bytes::<32>());
            let quotient = wide(effective) * wide(total.total_reward) / wide(total.total_stake);
            U256::try_from_be_slice(&quotient.to_bytes_be()).unwrap_or(U256::MAX)
        }
    }
}

/// Unclaimed reward of one delegation.
///
/// Returns zero when `last_reward_cycle <= last_withdraw_cycle`. Cycles without totals, or
/// with zero total stake, contribute nothing.
pub fn compute_reward(
    last_withdraw_cycle: u64,
    last_reward_cycle: u64,
    direct: &CycleAmounts,
    buffered: &CycleAmounts,
    historical: &CycleAmounts,
    totals: &BTreeMap<u64, CycleTotal>,
) -> U256 {
    let needed = needed_cycles(last_withdraw_cycle, last_reward_cycle);
    if needed.is_empty() {
        return U256::ZERO;
    }

    effective_stakes(needed, direct, buffered, historical)
        .into_iter()
        .filter_map(|(cycle, effective)| {
            totals.get(&cycle).map(|total| cycle_reward(effective, total))
        })
        .fold(U256::ZERO, |sum, reward| sum.saturating_add(reward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn amounts(entries: &[(u64, u64)]) -> CycleAmounts {
        entries.iter().map(|(cycle, amount)| (*cycle, U256::from(*amount))).collect()
    }

    fn totals(entries: &[(u64, u64, u64)]) -> BTreeMap<u64, CycleTotal> {
        entries
            .iter()
            .map(|(cycle, stake, reward)| {
                let total =
                    CycleTotal { total_stake: U256::from(*stake), total_reward: U256::from(*reward) };
                (*cycle, total)
            })
            .collect()
    }

    #[test]
    fn two_cycles_with_direct_and_buffered_deposits() {
        let direct = amounts(&[(5, 1000)]);
        let buffered = amounts(&[(4, 500)]);
        let totals = totals(&[(6, 100_000, 1000), (7, 100_000, 2000)]);

        // direct[5] and buffered[4] both land at cycle 6: 1000 + 500 = 1500, not 3500,
        // so the reward is 1500 * 1000 / 100000 + 1500 * 2000 / 100000 = 15 + 30 = 45.
        let effective = effective_stakes(6..=7, &direct, &buffered, &CycleAmounts::new());
        assert_eq!(effective, amounts(&[(6, 1500), (7, 1500)]));
        assert_eq!(cycle_reward(effective[&6], &totals[&6]), U256::from(15u64));
        assert_eq!(cycle_reward(effective[&7], &totals[&7]), U256::from(30u64));

        let reward = compute_reward(5, 7, &direct, &buffered, &CycleAmounts::new(), &totals);
        assert_eq!(reward, U256::from(45u64));
    }

    #[test]
    fn nothing_accrued_after_withdrawal_at_last_cycle() {
        let direct = amounts(&[(5, 1000)]);
        let buffered = amounts(&[(4, 500)]);
        let totals = totals(&[(6, 100_000, 1000), (7, 100_000, 2000)]);
        assert_eq!(
            compute_reward(7, 7, &direct, &buffered, &CycleAmounts::new(), &totals),
            U256::ZERO
        );
        // inconsistent bookkeeping is defined, not an error
        assert_eq!(
            compute_reward(9, 7, &direct, &buffered, &CycleAmounts::new(), &totals),
            U256::ZERO
        );
        assert!(needed_cycles(9, 7).is_empty());
    }

    #[test]
    fn buffered_deposit_takes_an_extra_cycle() {
        let direct = amounts(&[(3, 100)]);
        let buffered = amounts(&[(3, 1000)]);
        let effective = effective_stakes(3..=6, &direct, &buffered, &CycleAmounts::new());
        assert_eq!(effective, amounts(&[(3, 0), (4, 100), (5, 1100), (6, 1100)]));
    }

    #[test]
    fn stake_accumulates_from_before_the_needed_range() {
        let direct = amounts(&[(0, 10), (1, 20), (9, 40)]);
        let buffered = amounts(&[(0, 5)]);
        let totals = totals(&[(9, 35, 70), (10, 75, 150)]);
        // effective[9] = 10 + 20 + 5 = 35, effective[10] = 35 + 40 = 75
        let reward = compute_reward(8, 10, &direct, &buffered, &CycleAmounts::new(), &totals);
        assert_eq!(reward, U256::from(70u64 + 150u64));
    }

    #[test]
    fn missing_or_zero_totals_contribute_nothing() {
        let direct = amounts(&[(1, 1000)]);
        let none = CycleAmounts::new();
        let totals = totals(&[(2, 0, 500), (4, 2000, 100)]);
        // cycle 2 has zero stake, cycle 3 has no totals, cycle 4 pays 1000 * 100 / 2000
        assert_eq!(compute_reward(1, 4, &direct, &none, &none, &totals), U256::from(50u64));
    }

    #[test]
    fn division_truncates() {
        let total = CycleTotal { total_stake: U256::from(3u64), total_reward: U256::from(2u64) };
        assert_eq!(cycle_reward(U256::from(1u64), &total), U256::ZERO);
        assert_eq!(cycle_reward(U256::from(2u64), &total), U256::from(1u64));
    }

    #[test]
    fn product_wider_than_u256() {
        let big = U256::MAX >> 1usize;
        let total = CycleTotal { total_stake: big, total_reward: big };
        assert_eq!(cycle_reward(big, &total), big);

        let total = CycleTotal { total_stake: U256::from(4u64), total_reward: U256::from(2u64) };
        assert_eq!(cycle_reward(U256::MAX, &total), U256::MAX >> 1usize);
    }

    #[test]
    fn historical_snapshot_sets_effective_stake() {
        let direct = amounts(&[(5, 100)]);
        let historical = amounts(&[(5, 4000)]);
        let effective = effective_stakes(5..=7, &direct, &CycleAmounts::new(), &historical);
        assert_eq!(effective, amounts(&[(5, 4000), (6, 4100), (7, 4100)]));
    }

    #[test]
    fn repeated_invocations_agree() {
        let direct = amounts(&[(1, 7), (4, 13), (9, 1)]);
        let buffered = amounts(&[(2, 3), (6, 11)]);
        let totals = totals(&[(5, 97, 31), (6, 101, 29), (8, 103, 37), (10, 0, 5)]);
        let first = compute_reward(3, 10, &direct, &buffered, &CycleAmounts::new(), &totals);
        for _ in 0..10 {
            assert_eq!(
                compute_reward(3, 10, &direct, &buffered, &CycleAmounts::new(), &totals),
                first
            );
        }
    }

    proptest! {
        #[test]
        fn no_reward_without_new_cycles(
            last_reward in 0u64..500,
            gap in 0u64..50,
            deposits in proptest::collection::btree_map(0u64..600, 1u64..1_000_000, 0..20),
        ) {
            let direct = amounts(&deposits.iter().map(|(c, a)| (*c, *a)).collect::<Vec<_>>());
            let totals: BTreeMap<u64, CycleTotal> = (0..600)
                .map(|c| (c, CycleTotal { total_stake: U256::from(1000u64), total_reward: U256::from(10u64) }))
                .collect();
            let reward = compute_reward(last_reward + gap, last_reward, &direct, &direct, &direct, &totals);
            prop_assert_eq!(reward, U256::ZERO);
        }

        #[test]
        fn zero_stake_cycles_pay_nothing(
            last_withdraw in 0u64..50,
            span in 1u64..50,
            deposits in proptest::collection::btree_map(0u64..100, 1u64..1_000_000, 1..20),
        ) {
            let direct = amounts(&deposits.iter().map(|(c, a)| (*c, *a)).collect::<Vec<_>>());
            let totals: BTreeMap<u64, CycleTotal> = (0..100)
                .map(|c| (c, CycleTotal { total_stake: U256::ZERO, total_reward: U256::from(10u64) }))
                .collect();
            let none = CycleAmounts::new();
            let reward = compute_reward(last_withdraw, last_withdraw + span, &direct, &none, &none, &totals);
            prop_assert_eq!(reward, U256::ZERO);
        }
    }
}

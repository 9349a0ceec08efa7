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

//! Decoding of state-style and call-style payloads into typed values.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde_json::Value;

use crate::{
    contracts::{CallValue, ViewCall},
    correlate::Slot,
    query::{StateField, Target},
    reward::CycleTotal,
};

/// Deepest nesting a state path may address.
pub const MAX_PATH_DEPTH: usize = 8;

/// Divisor turning the stored commission rate into a fraction. The contract keeps
/// percent scaled by 10^7.
const COMMISSION_SCALE: f64 = 1e9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    /// Position inside an ADT `arguments` list
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

/// Outcome of a safe nested lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Found<'a> {
    Present(&'a Value),
    Absent,
}

impl<'a> Found<'a> {
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Found::Present(value) => Some(value),
            Found::Absent => None,
        }
    }

    /// Follows more segments from this point.
    pub fn at(self, path: &[PathSegment]) -> Found<'a> {
        match self {
            Found::Present(value) => follow(value, path),
            Found::Absent => Found::Absent,
        }
    }

    /// Amount stored at this point, zero when absent or unparseable.
    pub fn amount(self) -> U256 {
        self.value().and_then(parse_amount).unwrap_or(U256::ZERO)
    }

    /// Cycle number stored at this point, zero when absent or unparseable.
    pub fn cycle(self) -> u64 {
        self.value().and_then(parse_cycle).unwrap_or(0)
    }
}

/// Walks `path` through nested objects and ADT argument lists. Any missing key, wrong
/// container type or path deeper than [MAX_PATH_DEPTH] yields [Found::Absent].
pub fn follow<'a>(root: &'a Value, path: &[PathSegment]) -> Found<'a> {
    if path.len() > MAX_PATH_DEPTH {
        return Found::Absent;
    }
    let mut current = root;
    for segment in path {
        let next = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Object(map)) => {
                map.get("arguments").and_then(Value::as_array).and_then(|args| args.get(*index))
            }
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        };
        match next {
            Some(value) if !value.is_null() => current = value,
            _ => return Found::Absent,
        }
    }
    Found::Present(current)
}

/// Path from the top of a state result down to the entry a lookup addresses.
pub fn state_path(field: StateField, account: &Address, target: &Target) -> Vec<PathSegment> {
    std::iter::once(PathSegment::from(field.name()))
        .chain(field.keys(account, target).into_iter().map(PathSegment::from))
        .collect()
}

/// Resolves the entry a state lookup addresses inside its correlated payload.
pub fn state_entry<'a>(
    slot: &'a Slot,
    field: StateField,
    account: &Address,
    target: &Target,
) -> Found<'a> {
    match slot {
        Slot::Present(payload) => follow(payload, &state_path(field, account, target)),
        Slot::Absent => Found::Absent,
    }
}

pub fn parse_amount(value: &Value) -> Option<U256> {
    match value {
        Value::String(text) => text.trim().parse::<U256>().ok(),
        Value::Number(number) => number.as_u64().map(U256::from),
        _ => None,
    }
}

fn parse_cycle(value: &Value) -> Option<u64> {
    match value {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    }
}

/// Decodes a `cycle -> amount` map. Malformed keys or amounts are skipped.
pub fn cycle_amounts(found: Found<'_>) -> BTreeMap<u64, U256> {
    let Some(Value::Object(map)) = found.value() else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(cycle, amount)| {
            let decoded = cycle.parse::<u64>().ok().zip(parse_amount(amount));
            if decoded.is_none() {
                tracing::debug!("Skipping malformed cycle entry {cycle}: {amount}");
            }
            decoded
        })
        .collect()
}

/// Decodes a `pool -> amount` map, as read by an account-wide lookup. Keys that are not
/// addresses and unparseable amounts are skipped.
pub fn pool_amounts(found: Found<'_>) -> BTreeMap<Address, U256> {
    let Some(Value::Object(map)) = found.value() else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(pool, amount)| {
            let decoded = pool.parse::<Address>().ok().zip(parse_amount(amount));
            if decoded.is_none() {
                tracing::debug!("Skipping malformed pool entry {pool}: {amount}");
            }
            decoded
        })
        .collect()
}

/// Decodes a `cycle -> (total stake, total reward)` map.
pub fn cycle_totals(found: Found<'_>) -> BTreeMap<u64, CycleTotal> {
    let Some(Value::Object(map)) = found.value() else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(cycle, info)| {
            let cycle = cycle.parse::<u64>().ok()?;
            let info = Found::Present(info);
            let total_stake = info.at(&[PathSegment::Index(0)]).value().and_then(parse_amount)?;
            let total_reward = info.at(&[PathSegment::Index(1)]).value().and_then(parse_amount)?;
            Some((cycle, CycleTotal { total_stake, total_reward }))
        })
        .collect()
}

/// Pool record kept by the legacy contract.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolInfo {
    pub name: Option<String>,
    pub active: bool,
    pub stake: U256,
    pub commission: Option<f64>,
}

pub fn pool_info(found: Found<'_>) -> Option<PoolInfo> {
    let record = found.value()?;
    let arg = |index: usize| follow(record, &[PathSegment::Index(index)]);

    let active = arg(0)
        .value()
        .and_then(|status| status.get("constructor"))
        .and_then(Value::as_str)
        .is_some_and(|constructor| constructor == "True");
    let name = arg(3).value().and_then(Value::as_str).map(str::to_string);
    let commission = arg(7)
        .value()
        .and_then(parse_amount)
        .map(|rate| rate.to_string().parse::<f64>().unwrap_or(0.0) / COMMISSION_SCALE);

    Some(PoolInfo { name, active, stake: arg(1).amount(), commission })
}

/// Decodes call return data. Empty, non-hex or undecodable payloads are absent.
pub fn call_value(slot: &Slot, call: ViewCall) -> Option<CallValue> {
    let text = slot.value()?.as_str()?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    let data = match hex::decode(digits) {
        Ok(data) => data,
        Err(err) => {
            tracing::debug!("Return data of {call:?} is not hex: {err}");
            return None;
        }
    };
    match call.decode(&data) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!("Failed to decode return data of {call:?}: {err}");
            None
        }
    }
}

/// Convenience for calls declared to return a single uint256.
pub fn call_amount(slot: &Slot, call: ViewCall) -> Option<U256> {
    match call_value(slot, call)? {
        CallValue::Amount(amount) => Some(amount),
        _ => None,
    }
}

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

//! Matches batch response entries back to the lookups that asked for them.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    query::{CorrelationTable, Lookup},
    rpc::RpcResponse,
};

/// Raw payload of one lookup after correlation.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Present(Value),
    Absent,
}

impl Slot {
    pub fn is_present(&self) -> bool {
        matches!(self, Slot::Present(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Slot::Present(value) => Some(value),
            Slot::Absent => None,
        }
    }
}

static ABSENT: Slot = Slot::Absent;

/// Result of one physical batch keyed by correlation id and by lookup.
#[derive(Debug, Clone, Default)]
pub struct Correlated {
    slots: BTreeMap<u64, Slot>,
    by_lookup: BTreeMap<Lookup, u64>,
}

impl Correlated {
    pub fn slot(&self, id: u64) -> &Slot {
        self.slots.get(&id).unwrap_or(&ABSENT)
    }

    pub fn get(&self, lookup: &Lookup) -> &Slot {
        self.by_lookup.get(lookup).map(|id| self.slot(*id)).unwrap_or(&ABSENT)
    }

    pub fn present_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.is_present()).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn parse_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Placeholder results some nodes return instead of an error or null.
fn is_placeholder(result: &Value) -> bool {
    match result {
        Value::Null => true,
        Value::String(text) => text.is_empty() || text == "0x",
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn classify(response: RpcResponse) -> Slot {
    if let Some(error) = response.error {
        tracing::debug!("Entry {} returned error {}: {}", response.id, error.code, error.message);
        return Slot::Absent;
    }
    match response.result {
        Some(result) if !is_placeholder(&result) => Slot::Present(result),
        _ => Slot::Absent,
    }
}

/// Builds the id to payload mapping. Every id in `table` ends up with a slot; ids the
/// server never answered are absent and ids the table does not know are dropped.
///
/// When an id is answered more than once, a present payload wins over an absent one and
/// among present payloads the first one seen is kept.
pub fn correlate(table: &CorrelationTable, responses: Vec<RpcResponse>) -> Correlated {
    let mut slots: BTreeMap<u64, Slot> = table.keys().map(|id| (*id, Slot::Absent)).collect();

    for response in responses {
        let Some(id) = parse_id(&response.id) else {
            tracing::debug!("Ignoring entry without a usable id: {}", response.id);
            continue;
        };
        let Some(slot) = slots.get_mut(&id) else {
            tracing::debug!("Ignoring entry with unknown id {id}");
            continue;
        };
        let classified = classify(response);
        if !classified.is_present() {
            continue;
        }
        if slot.is_present() {
            tracing::warn!("Correlation id {id} answered more than once, keeping the first");
            continue;
        }
        *slot = classified;
    }

    let by_lookup = table.iter().map(|(id, lookup)| (*lookup, *id)).collect();
    Correlated { slots, by_lookup }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contracts::ViewCall,
        query::{Lookup, LookupKind, StateField},
    };
    use alloy::primitives::Address;
    use proptest::prelude::*;
    use serde_json::json;

    fn table(n: u64) -> CorrelationTable {
        (1..=n)
            .map(|id| (id, Lookup::call(Address::with_last_byte(id as u8), ViewCall::Rewards)))
            .collect()
    }

    #[test]
    fn missing_entry_is_absent() {
        let table = table(3);
        let responses = vec![
            RpcResponse::ok(3, json!("0x03")),
            RpcResponse::ok(1, json!("0x01")),
        ];
        let correlated = correlate(&table, responses);
        assert_eq!(correlated.slot(1), &Slot::Present(json!("0x01")));
        assert_eq!(correlated.slot(2), &Slot::Absent);
        assert_eq!(correlated.slot(3), &Slot::Present(json!("0x03")));
        assert_eq!(correlated.present_count(), 2);
        assert_eq!(correlated.get(&table[&3]), &Slot::Present(json!("0x03")));
    }

    #[test]
    fn errors_and_placeholders_are_absent() {
        let table = table(5);
        let responses = vec![
            RpcResponse::err(1, -32000, "execution reverted"),
            RpcResponse::ok(2, json!("0x")),
            RpcResponse::ok(3, Value::Null),
            RpcResponse::ok(4, json!({})),
            RpcResponse::ok(5, json!({"lastrewardcycle": "7"})),
        ];
        let correlated = correlate(&table, responses);
        for id in 1..=4 {
            assert_eq!(correlated.slot(id), &Slot::Absent, "id {id}");
        }
        assert!(correlated.slot(5).is_present());
    }

    #[test]
    fn unknown_and_string_ids() {
        let table = table(2);
        let responses = vec![
            RpcResponse::ok(99, json!("0x99")),
            RpcResponse { id: json!("2"), result: Some(json!("0x02")), error: None },
            RpcResponse { id: Value::Null, result: Some(json!("0xff")), error: None },
        ];
        let correlated = correlate(&table, responses);
        assert_eq!(correlated.len(), 2);
        assert_eq!(correlated.slot(2), &Slot::Present(json!("0x02")));
        assert_eq!(correlated.slot(99), &Slot::Absent);
    }

    #[test]
    fn lookup_outside_table_is_absent() {
        let correlated = correlate(&table(1), vec![RpcResponse::ok(1, json!("0x01"))]);
        let other = Lookup::network(LookupKind::State(StateField::LastRewardCycle));
        assert_eq!(correlated.get(&other), &Slot::Absent);
    }

    #[test]
    fn duplicate_answer_prefers_present() {
        let table = table(1);
        let responses =
            vec![RpcResponse::err(1, -1, "busy"), RpcResponse::ok(1, json!("0x01"))];
        assert!(correlate(&table, responses).slot(1).is_present());
    }

    fn entry(id: u64, kind: u8) -> RpcResponse {
        match kind % 3 {
            0 => RpcResponse::ok(id, json!(format!("0x{id:02x}"))),
            1 => RpcResponse::err(id, -32000, "reverted"),
            _ => RpcResponse::ok(id, json!("0x")),
        }
    }

    /// The same responses in id order and in an arbitrary order.
    fn orderings() -> impl Strategy<Value = (Vec<RpcResponse>, Vec<RpcResponse>)> {
        proptest::collection::vec(any::<u8>(), 1..24).prop_flat_map(|kinds| {
            let ordered: Vec<RpcResponse> =
                kinds.iter().enumerate().map(|(i, kind)| entry(i as u64 + 1, *kind)).collect();
            (Just(ordered.clone()), Just(ordered).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn permutation_does_not_change_mapping((ordered, shuffled) in orderings()) {
            let table = table(ordered.len() as u64 + 1);
            let a = correlate(&table, ordered);
            let b = correlate(&table, shuffled);
            for id in table.keys() {
                prop_assert_eq!(a.slot(*id), b.slot(*id));
            }
        }
    }
}

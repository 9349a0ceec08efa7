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

//! Turns logical lookups into JSON-RPC requests with correlation ids.

use std::collections::{BTreeMap, HashMap};

use alloy::primitives::Address;
use serde_json::{json, Value};

use crate::{
    address::{contract_param, state_key},
    config::Registry,
    contracts::ViewCall,
    errors::ScanError,
    rpc::RpcRequest,
};

pub const STATE_METHOD: &str = "GetSmartContractSubState";
pub const CALL_METHOD: &str = "eth_call";
pub const BLOCK_TAG: &str = "latest";

/// Fields of the legacy staking contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateField {
    DepositAmount,
    LastWithdrawCycle,
    LastRewardCycle,
    PoolInfo,
    DirectDeposits,
    BufferedDeposits,
    StakePerCycle,
    CycleTotals,
}

/// Which map keys below the field name a state lookup is addressed by.
enum KeyShape {
    None,
    Pool,
    AccountPool,
}

impl StateField {
    pub fn name(&self) -> &'static str {
        match self {
            StateField::DepositAmount => "deposit_amt_deleg",
            StateField::LastWithdrawCycle => "last_withdraw_cycle_deleg",
            StateField::LastRewardCycle => "lastrewardcycle",
            StateField::PoolInfo => "ssnlist",
            StateField::DirectDeposits => "direct_deposit_deleg",
            StateField::BufferedDeposits => "buff_deposit_deleg",
            StateField::StakePerCycle => "deleg_stake_per_cycle",
            StateField::CycleTotals => "stake_ssn_per_cycle",
        }
    }

    fn shape(&self) -> KeyShape {
        match self {
            StateField::LastRewardCycle => KeyShape::None,
            StateField::PoolInfo | StateField::CycleTotals => KeyShape::Pool,
            _ => KeyShape::AccountPool,
        }
    }

    /// Map keys under the field, in the order the contract nests them. A network target
    /// stops before the pool key and so reads the entries of every pool at once.
    pub fn keys(&self, account: &Address, target: &Target) -> Vec<String> {
        match (self.shape(), target) {
            (KeyShape::None, _) | (KeyShape::Pool, Target::Network) => vec![],
            (KeyShape::Pool, Target::Pool(pool)) => vec![state_key(pool)],
            (KeyShape::AccountPool, Target::Network) => vec![state_key(account)],
            (KeyShape::AccountPool, Target::Pool(pool)) => {
                vec![state_key(account), state_key(pool)]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKind {
    State(StateField),
    Call(ViewCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Network,
    Pool(Address),
}

/// One logical question asked of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lookup {
    pub target: Target,
    pub kind: LookupKind,
}

impl Lookup {
    pub fn network(kind: LookupKind) -> Self {
        Self { target: Target::Network, kind }
    }

    pub fn pool(pool: Address, kind: LookupKind) -> Self {
        Self { target: Target::Pool(pool), kind }
    }

    pub fn state(pool: Address, field: StateField) -> Self {
        Self::pool(pool, LookupKind::State(field))
    }

    pub fn call(pool: Address, call: ViewCall) -> Self {
        Self::pool(pool, LookupKind::Call(call))
    }
}

/// Side table from correlation id back to the lookup that produced it.
pub type CorrelationTable = BTreeMap<u64, Lookup>;

/// Requests of one builder, ready to send or to concatenate with another batch.
#[derive(Debug, Clone, Default)]
pub struct QueryBatch {
    pub requests: Vec<RpcRequest>,
    pub table: CorrelationTable,
}

impl QueryBatch {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Appends another batch, failing if any id is already taken.
    pub fn concat(mut self, other: QueryBatch) -> Result<Self, ScanError> {
        for (id, lookup) in other.table {
            if self.table.insert(id, lookup).is_some() {
                return Err(ScanError::DuplicateCorrelationId(id));
            }
        }
        self.requests.extend(other.requests);
        Ok(self)
    }
}

/// Allocates ids from a caller-supplied offset and renders each lookup into its wire request.
pub struct QueryBuilder<'a> {
    registry: &'a Registry,
    account: Address,
    next_id: u64,
    ids: HashMap<Lookup, u64>,
    batch: QueryBatch,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a Registry, account: Address, offset: u64) -> Self {
        Self {
            registry,
            account,
            next_id: offset,
            ids: HashMap::new(),
            batch: QueryBatch::default(),
        }
    }

    /// The id the next new lookup would receive. Use it as the offset of a follow-up
    /// builder whose batch gets concatenated onto this one.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Adds a lookup and returns its id. A lookup already present keeps its original id.
    pub fn push(&mut self, lookup: Lookup) -> Result<u64, ScanError> {
        if let Some(id) = self.ids.get(&lookup) {
            return Ok(*id);
        }
        let id = self.next_id;
        let request = self.render(id, &lookup)?;
        self.next_id += 1;
        self.ids.insert(lookup, id);
        self.batch.table.insert(id, lookup);
        self.batch.requests.push(request);
        Ok(id)
    }

    pub fn extend(&mut self, lookups: impl IntoIterator<Item = Lookup>) -> Result<(), ScanError> {
        for lookup in lookups {
            self.push(lookup)?;
        }
        Ok(())
    }

    pub fn finish(self) -> QueryBatch {
        self.batch
    }

    fn render(&self, id: u64, lookup: &Lookup) -> Result<RpcRequest, ScanError> {
        // The legacy contract keys state by pool, so only view calls need a registered pool.
        if let (LookupKind::Call(_), Target::Pool(pool)) = (lookup.kind, lookup.target) {
            if self.registry.pool(&pool).is_none() {
                return Err(ScanError::UnknownPool(pool));
            }
        }

        match lookup.kind {
            LookupKind::State(field) => {
                let contract =
                    self.registry.legacy_contract.ok_or(ScanError::MissingContract(field.name()))?;
                let params = json!([
                    contract_param(&contract),
                    field.name(),
                    field.keys(&self.account, &lookup.target)
                ]);
                Ok(RpcRequest::new(id, STATE_METHOD, params))
            }
            LookupKind::Call(call) => {
                let to = self.call_target(call, &lookup.target)?;
                let mut tx = serde_json::Map::new();
                tx.insert("to".into(), Value::from(state_key(&to)));
                tx.insert(
                    "data".into(),
                    Value::from(format!("0x{}", hex::encode(call.calldata(self.account)))),
                );
                if call.needs_sender() {
                    tx.insert("from".into(), Value::from(state_key(&self.account)));
                }
                Ok(RpcRequest::new(id, CALL_METHOD, json!([tx, BLOCK_TAG])))
            }
        }
    }

    fn call_target(&self, call: ViewCall, target: &Target) -> Result<Address, ScanError> {
        match (call, target) {
            (ViewCall::NetworkStake, _) => {
                self.registry.deposit_contract.ok_or(ScanError::MissingContract("getTotalStake"))
            }
            (ViewCall::TokenBalance, Target::Pool(pool)) => {
                let token = self.registry.pool(pool).and_then(|pool| pool.token);
                token.ok_or(ScanError::MissingContract("balanceOf"))
            }
            (_, Target::Pool(pool)) => Ok(*pool),
            (_, Target::Network) => Err(ScanError::MissingContract("pool view call")),
        }
    }
}

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

//! Staking position and reward scanner for delegations held in cycle-based pools, read
//! from raw contract state, and in pool-contract pools, read through view calls.
//!
//! A scan of one account takes at most two batched JSON-RPC round trips. See
//! [scanner::StakeScanner].

pub mod address;
pub mod aggregate;
pub mod config;
pub mod contracts;
pub mod correlate;
pub mod decode;
pub mod errors;
pub mod query;
pub mod reward;
pub mod rpc;
pub mod scanner;
pub mod units;

pub use aggregate::{AccountPositions, DelegationPosition, PoolStats};
pub use config::{AccountingModel, Config, Pool, PoolKind, Registry};
pub use errors::{CodedError, ScanError};
pub use rpc::{BatchTransport, HttpBatchTransport, TransportError};
pub use scanner::StakeScanner;

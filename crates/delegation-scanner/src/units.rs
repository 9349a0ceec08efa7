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

//! Amount scaling and serialization helpers.

use alloy::primitives::U256;
use serde::Serializer;

/// Decimals every amount is scaled to when amounts from different pools are compared or summed.
pub const NORMALIZED_DECIMALS: u8 = 18;

/// Largest decimals whose scale `10^decimals` fits in a U256.
pub const MAX_DECIMALS: u8 = 77;

fn pow10(exp: u8) -> U256 {
    U256::from(10u64).checked_pow(U256::from(exp)).unwrap_or(U256::MAX)
}

/// Rescales an amount from `decimals` to [NORMALIZED_DECIMALS], truncating extra precision.
pub fn normalize(amount: U256, decimals: u8) -> U256 {
    match decimals.cmp(&NORMALIZED_DECIMALS) {
        std::cmp::Ordering::Equal => amount,
        std::cmp::Ordering::Less => {
            amount.saturating_mul(pow10(NORMALIZED_DECIMALS - decimals))
        }
        std::cmp::Ordering::Greater => amount / pow10(decimals - NORMALIZED_DECIMALS),
    }
}

fn clamp_u128(value: U256) -> u128 {
    if value > U256::from(u128::MAX) {
        u128::MAX
    } else {
        value.to::<u128>()
    }
}

/// Lossy conversion to whole tokens, for estimates only.
pub fn to_tokens(amount: U256, decimals: u8) -> f64 {
    let scale = pow10(decimals);
    let whole = clamp_u128(amount / scale) as f64;
    let frac = clamp_u128(amount % scale) as f64;
    whole + frac / 10f64.powi(decimals as i32)
}

/// Serializes a U256 as a decimal string.
pub fn decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Serializes an optional U256 as a decimal string.
pub fn decimal_opt<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

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

//! Account address normalization.

use alloy::primitives::Address;

use crate::errors::ScanError;

/// Parses a hex account address, with or without `0x` and in any letter case.
///
/// Bech32 addresses must be converted before they reach the scanner.
pub fn normalize_account(input: &str) -> Result<Address, ScanError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() != 40 {
        return Err(ScanError::InvalidAddress(input.to_string()));
    }
    let bytes = hex::decode(digits).map_err(|_| ScanError::InvalidAddress(input.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Lowercase `0x` form used as a key in contract state maps.
pub fn state_key(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Lowercase form without prefix, as the state query API expects contract addresses.
pub fn contract_param(address: &Address) -> String {
    hex::encode(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn normalizes_any_case_and_prefix() {
        let expected = address!("b1fe20cd2b856ba1a4e08afb39dff5c80f0cbbca");
        for input in [
            "0xb1fE20CD2b856BA1a4e08afb39dfF5C80f0cBbCa",
            "b1fe20cd2b856ba1a4e08afb39dff5c80f0cbbca",
            "0XB1FE20CD2B856BA1A4E08AFB39DFF5C80F0CBBCA",
            "  0xb1fe20cd2b856ba1a4e08afb39dff5c80f0cbbca\n",
        ] {
            assert_eq!(normalize_account(input).unwrap(), expected, "{input}");
        }
        assert_eq!(state_key(&expected), "0xb1fe20cd2b856ba1a4e08afb39dff5c80f0cbbca");
        assert_eq!(contract_param(&expected), "b1fe20cd2b856ba1a4e08afb39dff5c80f0cbbca");
    }

    #[test]
    fn rejects_bech32_and_garbage() {
        for input in ["zil1ruzwjhykmxlugf5a2wlm78z9cjv0u3rt0e84w2", "0x1234", "", "0xzz"] {
            assert!(matches!(normalize_account(input), Err(ScanError::InvalidAddress(_))));
        }
    }
}

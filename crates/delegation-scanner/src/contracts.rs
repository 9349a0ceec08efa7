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

//! Delegation contract interfaces and the view calls the scanner issues.

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use serde::Serialize;

alloy::sol! {
    #![sol(all_derives)]

    /// Delegation pool, shared by the liquid and non-liquid variants.
    interface IDelegator {
        function getDelegatedAmount() external view returns (uint256);
        function rewards() external view returns (uint256);
        function getClaimable() external view returns (uint256);
        function getPendingClaims() external view returns (uint256[2][] claims);
        function getStake() external view returns (uint256);
        function getCommission() external view returns (uint256 numerator, uint256 denominator);
    }

    interface IERC20Balance {
        function balanceOf(address account) external view returns (uint256);
    }

    /// Network deposit contract.
    interface IDeposit {
        function getTotalStake() external view returns (uint256);
    }
}

/// View functions read from pool-contract pools and the deposit contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewCall {
    DelegatedAmount,
    Rewards,
    Claimable,
    PendingClaims,
    TokenBalance,
    PoolStake,
    Commission,
    NetworkStake,
}

/// A withdrawal that unlocks at a future block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingClaim {
    #[serde(serialize_with = "crate::units::decimal")]
    pub unlock_block: U256,
    #[serde(serialize_with = "crate::units::decimal")]
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallValue {
    Amount(U256),
    Commission { numerator: U256, denominator: U256 },
    PendingClaims(Vec<PendingClaim>),
}

impl ViewCall {
    /// Whether the call must be sent with the account as `from`.
    pub fn needs_sender(&self) -> bool {
        matches!(
            self,
            ViewCall::DelegatedAmount
                | ViewCall::Rewards
                | ViewCall::Claimable
                | ViewCall::PendingClaims
        )
    }

    pub fn calldata(&self, account: Address) -> Vec<u8> {
        match self {
            ViewCall::DelegatedAmount => IDelegator::getDelegatedAmountCall {}.abi_encode(),
            ViewCall::Rewards => IDelegator::rewardsCall {}.abi_encode(),
            ViewCall::Claimable => IDelegator::getClaimableCall {}.abi_encode(),
            ViewCall::PendingClaims => IDelegator::getPendingClaimsCall {}.abi_encode(),
            ViewCall::TokenBalance => IERC20Balance::balanceOfCall { account }.abi_encode(),
            ViewCall::PoolStake => IDelegator::getStakeCall {}.abi_encode(),
            ViewCall::Commission => IDelegator::getCommissionCall {}.abi_encode(),
            ViewCall::NetworkStake => IDeposit::getTotalStakeCall {}.abi_encode(),
        }
    }

    /// Decodes return data with the call's declared return signature.
    pub fn decode(&self, data: &[u8]) -> alloy::sol_types::Result<CallValue> {
        let value = match self {
            ViewCall::DelegatedAmount => {
                CallValue::Amount(IDelegator::getDelegatedAmountCall::abi_decode_returns(data)?)
            }
            ViewCall::Rewards => {
                CallValue::Amount(IDelegator::rewardsCall::abi_decode_returns(data)?)
            }
            ViewCall::Claimable => {
                CallValue::Amount(IDelegator::getClaimableCall::abi_decode_returns(data)?)
            }
            ViewCall::TokenBalance => {
                CallValue::Amount(IERC20Balance::balanceOfCall::abi_decode_returns(data)?)
            }
            ViewCall::PoolStake => {
                CallValue::Amount(IDelegator::getStakeCall::abi_decode_returns(data)?)
            }
            ViewCall::NetworkStake => {
                CallValue::Amount(IDeposit::getTotalStakeCall::abi_decode_returns(data)?)
            }
            ViewCall::Commission => {
                let ret = IDelegator::getCommissionCall::abi_decode_returns(data)?;
                CallValue::Commission { numerator: ret.numerator, denominator: ret.denominator }
            }
            ViewCall::PendingClaims => {
                let claims = IDelegator::getPendingClaimsCall::abi_decode_returns(data)?;
                CallValue::PendingClaims(
                    claims
                        .into_iter()
                        .map(|[unlock_block, amount]| PendingClaim { unlock_block, amount })
                        .collect(),
                )
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolValue;

    #[test]
    fn selectors_match_signatures() {
        let account = Address::repeat_byte(0xab);
        assert_eq!(
            ViewCall::DelegatedAmount.calldata(account)[..4],
            alloy::primitives::keccak256("getDelegatedAmount()")[..4]
        );
        let balance = ViewCall::TokenBalance.calldata(account);
        assert_eq!(balance[..4], alloy::primitives::keccak256("balanceOf(address)")[..4]);
        assert_eq!(balance.len(), 4 + 32);
        assert_eq!(&balance[16..], account.as_slice());
    }

    #[test]
    fn decodes_declared_returns() {
        let amount = U256::from(1_234_567u64).abi_encode();
        assert_eq!(
            ViewCall::Rewards.decode(&amount).unwrap(),
            CallValue::Amount(U256::from(1_234_567u64))
        );

        let commission = (U256::from(5u64), U256::from(100u64)).abi_encode_params();
        assert_eq!(
            ViewCall::Commission.decode(&commission).unwrap(),
            CallValue::Commission { numerator: U256::from(5u64), denominator: U256::from(100u64) }
        );

        let claims = vec![
            [U256::from(900u64), U256::from(10u64)],
            [U256::from(950u64), U256::from(20u64)],
        ]
        .abi_encode();
        match ViewCall::PendingClaims.decode(&claims).unwrap() {
            CallValue::PendingClaims(claims) => {
                assert_eq!(claims.len(), 2);
                assert_eq!(claims[1].unlock_block, U256::from(950u64));
                assert_eq!(claims[1].amount, U256::from(20u64));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_return_data_fails() {
        assert!(ViewCall::PoolStake.decode(&[0x01, 0x02]).is_err());
        assert!(ViewCall::Commission.decode(&U256::from(1u64).abi_encode()).is_err());
    }
}

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

use alloy::primitives::Address;
use thiserror::Error;

use crate::{config::ConfigErr, rpc::TransportError};

pub trait CodedError: std::error::Error {
    fn code(&self) -> &str;
}

/// Implements `Debug` in terms of the error code and `Display` output so that
/// `{:?}` in logs and `anyhow` chains carries the code.
#[macro_export]
macro_rules! impl_coded_debug {
    ($name:ident) => {
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} {}", $crate::errors::CodedError::code(self), self)
            }
        }
    };
}

/// Fatal errors of a scan. Anything not listed here degrades to an absent or zero value.
#[derive(Error)]
pub enum ScanError {
    #[error("invalid account address {0:?}")]
    InvalidAddress(String),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("registry misconfigured: {0}")]
    Config(#[from] ConfigErr),

    #[error("pool {0} is not part of the registry")]
    UnknownPool(Address),

    #[error("lookup {0} requires a registry contract that is not configured")]
    MissingContract(&'static str),

    #[error("correlation id {0} is allocated twice in one batch")]
    DuplicateCorrelationId(u64),
}

impl_coded_debug!(ScanError);

impl CodedError for ScanError {
    fn code(&self) -> &str {
        match self {
            ScanError::InvalidAddress(_) => "[S-SCAN-001]",
            ScanError::Transport(err) => err.code(),
            ScanError::Config(err) => err.code(),
            ScanError::UnknownPool(_) => "[S-SCAN-002]",
            ScanError::MissingContract(_) => "[S-SCAN-003]",
            ScanError::DuplicateCorrelationId(_) => "[S-SCAN-004]",
        }
    }
}

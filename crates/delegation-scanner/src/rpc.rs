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

//! JSON-RPC envelopes and the batch transport seam.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::errors::CodedError;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{code} HTTP request failed: {0}", code = self.code())]
    Http(#[from] reqwest::Error),

    #[error("{code} RPC endpoint answered with status {0}", code = self.code())]
    Status(u16),

    #[error("{code} RPC error {error_code}: {message}", code = self.code())]
    Protocol { error_code: i64, message: String },

    #[error("{code} malformed batch response: {0}", code = self.code())]
    Malformed(String),
}

impl CodedError for TransportError {
    fn code(&self) -> &str {
        match self {
            TransportError::Http(_) => "[S-RPC-001]",
            TransportError::Status(_) => "[S-RPC-002]",
            TransportError::Protocol { .. } => "[S-RPC-003]",
            TransportError::Malformed(_) => "[S-RPC-004]",
        }
    }
}

/// A single JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id, method: method.into(), params }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A single JSON-RPC response entry. The id is kept raw since servers differ on
/// whether they echo it as a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self { id: Value::from(id), result: Some(result), error: None }
    }

    pub fn err(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            id: Value::from(id),
            result: None,
            error: Some(RpcErrorObject { code, message: message.into(), data: None }),
        }
    }
}

/// Sends one physical batch per call. Implementations return whatever entries the
/// server produced, in whatever order; correlation is the caller's concern.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn send_batch(&self, batch: &[RpcRequest]) -> Result<Vec<RpcResponse>, TransportError>;
}

#[async_trait]
impl<T: BatchTransport + ?Sized> BatchTransport for std::sync::Arc<T> {
    async fn send_batch(&self, batch: &[RpcRequest]) -> Result<Vec<RpcResponse>, TransportError> {
        (**self).send_batch(batch).await
    }
}

/// Splits a batch response body into entries.
///
/// An array is a normal answer; entries that are not response objects are skipped.
/// A lone object carrying `error` means the whole batch was rejected.
pub fn parse_batch_body(body: Value) -> Result<Vec<RpcResponse>, TransportError> {
    match body {
        Value::Array(entries) => Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RpcResponse>(entry) {
                Ok(response) => Some(response),
                Err(err) => {
                    tracing::debug!("Skipping unparseable batch entry: {err}");
                    None
                }
            })
            .collect()),
        Value::Object(map) if map.contains_key("error") => {
            let response: RpcResponse = serde_json::from_value(Value::Object(map))
                .map_err(|err| TransportError::Malformed(err.to_string()))?;
            let error = response.error.unwrap_or(RpcErrorObject {
                code: 0,
                message: "unknown error".to_string(),
                data: None,
            });
            Err(TransportError::Protocol { error_code: error.code, message: error.message })
        }
        other => Err(TransportError::Malformed(format!("expected an array, got {other}"))),
    }
}

#[derive(Clone, Debug)]
/// Batch transport over HTTP POST
pub struct HttpBatchTransport {
    client: Client,
    url: Url,
}

impl HttpBatchTransport {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("delegation-scanner/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl BatchTransport for HttpBatchTransport {
    async fn send_batch(&self, batch: &[RpcRequest]) -> Result<Vec<RpcResponse>, TransportError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let response = self.client.post(self.url.clone()).json(batch).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let body: Value = response.json().await?;
        let entries = parse_batch_body(body)?;

        tracing::debug!(
            "Batch of {} requests answered with {} entries in {}ms",
            batch.len(),
            entries.len(),
            start.elapsed().as_millis()
        );
        Ok(entries)
    }
}

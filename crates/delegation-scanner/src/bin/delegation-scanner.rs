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

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use delegation_scanner::{Config, HttpBatchTransport, StakeScanner};
use tracing_subscriber::fmt::format::FmtSpan;
use url::Url;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct MainArgs {
    /// Path to the scanner config TOML.
    #[clap(short, long, env = "SCANNER_CONFIG", default_value = "registry/mainnet.toml")]
    config: PathBuf,
    /// Overrides the RPC endpoint of the config file.
    #[clap(long, env = "RPC_URL")]
    rpc_url: Option<Url>,
    /// Emit logs as JSON.
    #[clap(long, default_value_t = false)]
    log_json: bool,
    /// Account to scan, as hex with or without `0x`.
    account: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = MainArgs::parse();

    if args.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .json()
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    run(&args).await
}

async fn run(args: &MainArgs) -> Result<()> {
    let config = Config::load(&args.config).await?;
    let url = args.rpc_url.clone().unwrap_or(config.rpc.url);

    tracing::info!("Using RPC endpoint {url}");
    let transport = HttpBatchTransport::new(url, Duration::from_secs(config.rpc.timeout_secs))
        .context("Failed to build RPC transport")?;
    let scanner = StakeScanner::new(transport, Arc::new(config.registry))?;

    let positions = scanner.scan(&args.account).await.context("Scan failed")?;
    let output =
        serde_json::to_string_pretty(&positions).context("Failed to serialize positions")?;
    println!("{output}");

    Ok(())
}

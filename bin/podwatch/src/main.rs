// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::Result;
use clap::Parser;
use podnet::{ClientConfig, NetworkSummary, NodeDataClient};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "podwatch", about = "Polls the pod network and logs a health summary")]
struct Args {
    /// Optional toml config file; environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Poll interval in seconds.
    #[arg(long, default_value_t = 30)]
    interval: u64,

    /// Fetch once and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_file(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env();
    let client = NodeDataClient::new(config)?;

    if args.once {
        poll(&client).await?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    loop {
        ticker.tick().await;
        if let Err(err) = poll(&client).await {
            warn!(error = %err, "Poll failed");
        }
    }
}

async fn poll(client: &NodeDataClient) -> Result<()> {
    let data = client.fetch_pods_with_credits().await?;

    if data.snapshot.stale {
        let age = client
            .pods_cache_age()
            .await
            .map_or_else(|| "unknown".to_string(), |age| format!("{}s", age.as_secs()));
        warn!(cache_age = %age, "Endpoints unreachable, showing cached data");
    }

    let summary = NetworkSummary::from_pods(&data.snapshot.pods, &data.credits);
    info!(
        total = summary.total_pods,
        online = summary.online,
        warning = summary.warning,
        offline = summary.offline,
        public = summary.public_pods,
        storage_committed = summary.storage_committed,
        storage_used = summary.storage_used,
        average_x_score = summary.average_x_score,
        "Network summary"
    );
    Ok(())
}

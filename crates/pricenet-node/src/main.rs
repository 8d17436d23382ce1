//! # PriceNet Node
//!
//! Binary entry point. Initializes logging, loads configuration from the
//! environment, assembles the node over the dev adapters, and runs until
//! Ctrl+C.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PRICENET_MINERS` | CPU count | Worker tasks in the mining pool |
//! | `PRICENET_RECORDS_PER_BLOCK` | `3` | Records submitted per block |
//! | `PRICENET_MINER_ID` | (required) | This node's identity string |
//! | `PRICENET_COINBASE` | (required) | Reward payout address |
//! | `PRICENET_MINUTE_MS` | `1000` | Simulated ledger minute, in ms |

use anyhow::Result;
use pricenet_node::{NodeConfig, NodeRuntime};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::from_env();
    let runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}

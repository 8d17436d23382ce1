//! # Node Runtime
//!
//! Assembly and lifecycle of one PriceNet node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (env overrides on defaults)
//! 2. Validate; setup errors abort with a descriptive message
//! 3. Create the shared shutdown channel
//! 4. Wire ports to adapters, spawn grader, stat tracker, coordinator
//! 5. Run until cancelled

use crate::adapters::{MemoryLedger, SimulatedClock, StaticPriceSource};
use anyhow::{Context, Result};
use pricenet_grading::Grader;
use pricenet_mining::{Coordinator, MiningConfig, StatTracker};
use shared_types::BlockClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Top-level node configuration.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Mining subsystem configuration.
    pub mining: MiningConfig,

    /// Wall-clock length of one simulated ledger minute.
    pub minute_interval: Duration,

    /// Dev-ledger coinbase balance.
    pub dev_balance: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            mining: MiningConfig::default(),
            minute_interval: Duration::from_secs(1),
            dev_balance: 1_000,
        }
    }
}

impl NodeConfig {
    /// Applies `PRICENET_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(miners) = std::env::var("PRICENET_MINERS") {
            if let Ok(n) = miners.parse() {
                config.mining.num_miners = n;
            }
        }
        if let Ok(keep) = std::env::var("PRICENET_RECORDS_PER_BLOCK") {
            if let Ok(n) = keep.parse() {
                config.mining.records_per_block = n;
            }
        }
        if let Ok(id) = std::env::var("PRICENET_MINER_ID") {
            config.mining.miner_id = id;
        }
        if let Ok(address) = std::env::var("PRICENET_COINBASE") {
            config.mining.coinbase_address = address;
        }
        if let Ok(ms) = std::env::var("PRICENET_MINUTE_MS") {
            if let Ok(n) = ms.parse() {
                config.minute_interval = Duration::from_millis(n);
            }
        }
        config
    }
}

/// One assembled node: coordinator + grader + stat tracker over the dev
/// adapters.
pub struct NodeRuntime {
    ledger: Arc<MemoryLedger>,
    grader: Arc<Grader>,
    winners_rx: watch::Receiver<Vec<String>>,
    stats: Arc<StatTracker>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    config: NodeConfig,
}

impl NodeRuntime {
    /// Validates the configuration and assembles the node.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config
            .mining
            .validate()
            .context("invalid mining configuration")?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ledger = Arc::new(MemoryLedger::with_balance(config.dev_balance));
        let (grader, winners_rx) =
            Grader::new(Arc::clone(&ledger) as Arc<dyn pricenet_grading::RecordPool>);
        let stats = Arc::new(StatTracker::new());

        Ok(Self {
            ledger,
            grader,
            winners_rx,
            stats,
            shutdown_tx,
            shutdown_rx,
            config,
        })
    }

    /// Spawns every task of the node and returns once they are running.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  PriceNet Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!("  Miners: {}", self.config.mining.num_miners);
        info!(
            "  Records per block: {}",
            self.config.mining.records_per_block
        );
        info!("  Miner ID: {}", self.config.mining.miner_id);

        let clock = SimulatedClock::start(self.config.minute_interval, self.shutdown_rx.clone());

        // Grader first, so the winners channel is live before mining is.
        {
            let grader = Arc::clone(&self.grader);
            let clock: Arc<dyn BlockClock> = Arc::clone(&clock) as Arc<dyn BlockClock>;
            let shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move { grader.run(clock, shutdown).await });
        }

        // Stat tracker.
        let (stats_tx, stats_rx) = mpsc::channel(16);
        {
            let stats = Arc::clone(&self.stats);
            let shutdown = self.shutdown_rx.clone();
            tokio::spawn(async move { stats.collect(stats_rx, shutdown).await });
        }

        // Mining coordinator.
        let mut coordinator = Coordinator::new(
            self.config.mining.clone(),
            Arc::new(StaticPriceSource::flat()),
            Arc::clone(&self.ledger) as Arc<dyn pricenet_mining::LedgerClient>,
            Arc::clone(&clock) as Arc<dyn BlockClock>,
            self.winners_rx.clone(),
            stats_tx,
            self.shutdown_rx.clone(),
        )?;
        coordinator.spawn_miners();
        tokio::spawn(async move {
            if let Err(e) = coordinator.run().await {
                error!("[runtime] coordinator exited: {e}");
            }
        });

        info!("[runtime] all subsystems running");
        Ok(())
    }

    /// Signals shutdown and gives tasks a moment to drain.
    pub async fn shutdown(&self) {
        info!("[runtime] initiating graceful shutdown");
        if self.shutdown_tx.send(true).is_err() {
            error!("[runtime] shutdown receivers already gone");
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        info!("[runtime] shutdown complete");
    }

    /// The dev ledger (also the grader's record pool).
    pub fn ledger(&self) -> Arc<MemoryLedger> {
        Arc::clone(&self.ledger)
    }

    /// The grading service.
    pub fn grader(&self) -> Arc<Grader> {
        Arc::clone(&self.grader)
    }

    /// The stat tracker.
    pub fn stats(&self) -> Arc<StatTracker> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_config() -> NodeConfig {
        NodeConfig {
            mining: MiningConfig {
                num_miners: 2,
                records_per_block: 2,
                minimum_score: 0,
                miner_id: "dev-node".to_string(),
                coinbase_address: "PN-coinbase-dev".to_string(),
            },
            minute_interval: Duration::from_millis(10),
            dev_balance: 100,
        }
    }

    #[test]
    fn test_invalid_config_fails_assembly() {
        let mut config = dev_config();
        config.mining.miner_id.clear();
        assert!(NodeRuntime::new(config).is_err());
    }

    #[tokio::test]
    async fn test_node_mines_a_block_end_to_end() {
        let runtime = NodeRuntime::new(dev_config()).unwrap();
        runtime.start().await.unwrap();

        // Height 1's window closes within ~100ms of simulated time; give
        // the node a generous margin.
        let ledger = runtime.ledger();
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                if ledger.revealed_count(1) >= 2 {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("height 1 should produce revealed records");

        runtime.shutdown().await;
    }
}

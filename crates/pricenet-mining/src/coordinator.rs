//! # Mining Coordinator
//!
//! Owns the worker pool and drives the per-height lifecycle off the block
//! clock:
//!
//! - **minute 1** (first tick of a height): check the coinbase balance,
//!   fetch a price snapshot, build the record template, roll a fresh
//!   [`RecordWriter`], and broadcast the start batch to every worker
//! - **minute 9**: broadcast submit + pause, kick off the writer's
//!   collection, and drain one stats report per worker
//! - anything else: no-op
//!
//! The lifecycle is edge-triggered through a local `mining` flag, so
//! repeated ticks of the same minute change nothing.

use crate::config::MiningConfig;
use crate::domain::{GroupStats, MinerStats};
use crate::error::{MiningError, Result};
use crate::miner::{CommandBatch, Miner, MinerCommand};
use crate::ports::{LedgerClient, PriceSource};
use crate::writer::RecordWriter;
use crate::COMMAND_BUFFER;
use shared_types::{BlockClock, OracleRecord};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// A worker as the coordinator sees it: an ID and a command channel.
#[derive(Debug)]
pub struct ControlledMiner {
    /// Worker ID (also its nonce lane).
    pub id: usize,
    commands: mpsc::Sender<MinerCommand>,
}

impl ControlledMiner {
    /// Sends one command to the worker, awaiting inbox space.
    pub async fn send(&self, command: MinerCommand) {
        if self.commands.send(command).await.is_err() {
            warn!("[mining] miner {} inbox closed", self.id);
        }
    }
}

/// Orchestrates the worker pool through each block's mining window.
pub struct Coordinator {
    config: MiningConfig,
    miners: Vec<ControlledMiner>,
    writer: Arc<RecordWriter>,
    prices: Arc<dyn PriceSource>,
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn BlockClock>,
    winners: watch::Receiver<Vec<String>>,
    stats_out: mpsc::Sender<GroupStats>,
    shutdown: watch::Receiver<bool>,
    // Worker IDs are issued here, sequentially, at construction time.
    next_id: usize,
}

impl Coordinator {
    /// Creates a coordinator and its first (not yet templated) writer.
    /// Fails fast on an invalid configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: MiningConfig,
        prices: Arc<dyn PriceSource>,
        ledger: Arc<dyn LedgerClient>,
        clock: Arc<dyn BlockClock>,
        winners: watch::Receiver<Vec<String>>,
        stats_out: mpsc::Sender<GroupStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        config.validate()?;
        let writer = RecordWriter::new(
            config.records_per_block,
            config.num_miners,
            Arc::clone(&ledger),
            shutdown.clone(),
        );
        Ok(Self {
            config,
            miners: Vec::new(),
            writer,
            prices,
            ledger,
            clock,
            winners,
            stats_out,
            shutdown,
            next_id: 1,
        })
    }

    /// Spawns the worker pool, one task per worker, all paused.
    pub fn spawn_miners(&mut self) {
        for _ in 0..self.config.num_miners {
            let id = self.allocate_id();
            let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
            let miner = Miner::new(id, self.config.records_per_block, command_rx);
            tokio::spawn(miner.run(self.shutdown.clone()));
            self.miners.push(ControlledMiner {
                id,
                commands: command_tx,
            });
        }
        info!(
            miners = self.miners.len(),
            "[mining] worker pool launched, waiting for minute 1"
        );
    }

    fn allocate_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The workers under this coordinator's control.
    pub fn miners(&self) -> &[ControlledMiner] {
        &self.miners
    }

    /// The tick loop. Consumes the coordinator; runs until cancelled or
    /// the clock closes.
    pub async fn run(mut self) -> Result<()> {
        let mut ticks = self.clock.subscribe().await;
        let mut shutdown = self.shutdown.clone();
        let mut mining = false;
        let mut stats_rx: Option<mpsc::Receiver<MinerStats>> = None;

        loop {
            let tick = tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("[mining] coordinator shutting down");
                        return Ok(());
                    }
                    continue;
                }
                tick = ticks.recv() => tick.ok_or(MiningError::ClockClosed)?,
            };

            debug!(height = tick.height, minute = tick.minute, "[mining] tick");
            match tick.minute {
                1 if !mining => match self.start_round(tick.height).await {
                    Ok(rx) => {
                        stats_rx = Some(rx);
                        mining = true;
                    }
                    Err(e) => {
                        error!(
                            height = tick.height,
                            "[mining] sitting out this block: {e}"
                        );
                    }
                },
                9 if mining => {
                    mining = false;
                    self.finish_round(tick.height, stats_rx.take()).await;
                }
                _ => {}
            }
        }
    }

    /// Minute-1 work: gate on balance, build the template, roll the
    /// writer, broadcast the start batch. Returns the height's stats
    /// channel.
    async fn start_round(&mut self, height: u64) -> Result<mpsc::Receiver<MinerStats>> {
        let balance = self.ledger.balance(&self.config.coinbase_address).await?;
        if balance == 0 {
            return Err(MiningError::InvalidConfig(
                "coinbase balance is zero, cannot pay for record entries".to_string(),
            ));
        }

        let template = self.build_template(height).await?;
        let target = template.record_hash()?;

        self.writer = self.writer.next_block_writer();
        self.writer.set_template(template);

        let (stats_tx, stats_rx) = mpsc::channel(self.miners.len().max(1));
        for miner in &self.miners {
            let start = CommandBatch::new()
                .aggregator(self.writer.attach())
                .stats_sink(stats_tx.clone())
                .reset()
                .target(target)
                .minimum_score(self.config.minimum_score)
                .resume()
                .build();
            miner.send(start).await;
        }

        info!(
            height,
            target = %hex::encode(target),
            floor = self.config.minimum_score,
            "[mining] begin mining new record"
        );
        Ok(stats_rx)
    }

    /// Minute-9 work: stop the pool, collect results, drain exactly one
    /// stats report per worker and forward the group.
    async fn finish_round(&mut self, height: u64, stats_rx: Option<mpsc::Receiver<MinerStats>>) {
        for miner in &self.miners {
            miner
                .send(CommandBatch::new().submit().pause().build())
                .await;
        }

        // Non-blocking: a stuck ledger stalls only this height's writer.
        Arc::clone(&self.writer).collect_and_write(false).await;

        let mut group = GroupStats::new(height);
        if let Some(mut stats_rx) = stats_rx {
            let mut shutdown = self.shutdown.clone();
            for _ in 0..self.miners.len() {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return;
                        }
                    }
                    stats = stats_rx.recv() => match stats {
                        Some(stats) => group.insert(stats),
                        None => break,
                    }
                }
            }
        }
        if self.stats_out.try_send(group).is_err() {
            debug!("[mining] stats tracker not keeping up, report dropped");
        }
    }

    /// Builds the height's record template from a fresh snapshot and the
    /// latest published winners. A partial snapshot aborts the height.
    async fn build_template(&self, height: u64) -> Result<OracleRecord> {
        let snapshot = self.prices.snapshot().await?;
        if !snapshot.is_complete() {
            let missing = shared_types::ASSET_REGISTRY
                .iter()
                .filter(|code| !snapshot.prices.contains_key(**code))
                .count();
            return Err(MiningError::PartialSnapshot { missing });
        }
        let record = OracleRecord {
            coinbase_address: self.config.coinbase_address.clone(),
            height,
            previous_winners: self.winners.borrow().clone(),
            miner_id: self.config.miner_id.clone(),
            assets: snapshot.prices,
        };
        record.validate()?;
        Ok(record)
    }

    /// Broadcasts one command to every worker. Exposed for the network
    /// mining facade, which reuses the pool without the tick loop.
    pub async fn broadcast(&self, command: MinerCommand) {
        for miner in &self.miners {
            miner.send(command.clone()).await;
        }
    }

    /// The current height's writer.
    pub fn writer(&self) -> Arc<RecordWriter> {
        Arc::clone(&self.writer)
    }
}

//! # Development Adapters
//!
//! In-memory implementations of the external ports. The live deployment
//! replaces these with the real exchange pollers and the foreign-ledger
//! RPC client; the dev node and the test suite run against these.

use async_trait::async_trait;
use pricenet_grading::RecordPool;
use pricenet_mining::{LedgerClient, PriceSource};
use shared_types::{
    asset_registry, BlockClock, BlockTick, LedgerError, PriceSnapshot, SubmittedRecord,
    PRICE_SCALE,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// A block clock that fabricates the foreign ledger's cadence: ten
/// minutes per height, one driver task, every subscriber sees the same
/// ticks.
pub struct SimulatedClock {
    subscribers: Mutex<Vec<mpsc::Sender<BlockTick>>>,
}

impl SimulatedClock {
    /// Starts the driver. `minute_interval` is the wall-clock length of
    /// one simulated minute.
    pub fn start(
        minute_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::sync::Arc<Self> {
        let clock = std::sync::Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
        });
        let driver = std::sync::Arc::clone(&clock);
        tokio::spawn(async move {
            let mut height = 1u64;
            loop {
                for minute in 0..=9u8 {
                    tokio::select! {
                        _ = tokio::time::sleep(minute_interval) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                return;
                            }
                        }
                    }
                    let tick = BlockTick { height, minute };
                    debug!(height, minute, "[runtime] simulated tick");
                    // A lagging subscriber loses this tick; only a closed
                    // one is unregistered.
                    driver.subscribers.lock().unwrap().retain(|tx| {
                        !matches!(tx.try_send(tick), Err(mpsc::error::TrySendError::Closed(_)))
                    });
                }
                height += 1;
            }
        });
        clock
    }
}

#[async_trait]
impl BlockClock for SimulatedClock {
    async fn subscribe(&self) -> mpsc::Receiver<BlockTick> {
        let (tx, rx) = mpsc::channel(32);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

/// A price source serving one fixed table for the full registry.
pub struct StaticPriceSource {
    prices: BTreeMap<String, u64>,
}

impl StaticPriceSource {
    /// Every asset priced at 1.0, a serviceable dev default.
    pub fn flat() -> Self {
        Self {
            prices: asset_registry().map(|c| (c.to_string(), PRICE_SCALE)).collect(),
        }
    }

    /// A source with explicit prices.
    pub fn with_prices(prices: BTreeMap<String, u64>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn snapshot(&self) -> pricenet_mining::Result<PriceSnapshot> {
        Ok(PriceSnapshot {
            prices: self.prices.clone(),
            timestamp: unix_now(),
        })
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// An in-memory ledger: commits stage an entry, reveals make it visible.
/// Doubles as the submission-pool reader, which closes the
/// mine → commit → grade loop for the dev node.
#[derive(Default)]
pub struct MemoryLedger {
    balance: u64,
    staged: Mutex<HashSet<Vec<u8>>>,
    revealed: Mutex<HashMap<u64, Vec<SubmittedRecord>>>,
}

impl MemoryLedger {
    /// A ledger whose coinbase account holds `balance` base units.
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Number of revealed records at a height.
    pub fn revealed_count(&self, height: u64) -> usize {
        self.revealed
            .lock()
            .unwrap()
            .get(&height)
            .map_or(0, Vec::len)
    }

    /// The revealed records at a height, without going through the async
    /// pool-reader port.
    pub fn revealed_at(&self, height: u64) -> Vec<SubmittedRecord> {
        self.revealed
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_default()
    }

    fn entry_key(entry: &SubmittedRecord) -> Vec<u8> {
        let mut key = entry.nonce.clone();
        key.extend_from_slice(&entry.record_hash);
        key
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn commit(&self, entry: &SubmittedRecord) -> Result<(), LedgerError> {
        self.staged.lock().unwrap().insert(Self::entry_key(entry));
        Ok(())
    }

    async fn reveal(&self, entry: &SubmittedRecord) -> Result<(), LedgerError> {
        if !self.staged.lock().unwrap().remove(&Self::entry_key(entry)) {
            return Err(LedgerError::Rejected(
                "reveal without matching commit".to_string(),
            ));
        }
        self.revealed
            .lock()
            .unwrap()
            .entry(entry.record.height)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn balance(&self, _address: &str) -> Result<u64, LedgerError> {
        Ok(self.balance)
    }
}

#[async_trait]
impl RecordPool for MemoryLedger {
    async fn records_for_height(&self, height: u64) -> Result<Vec<SubmittedRecord>, LedgerError> {
        Ok(self
            .revealed
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_default())
    }
}

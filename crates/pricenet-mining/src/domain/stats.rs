//! # Mining Statistics
//!
//! Telemetry only; nothing here bears on correctness. Each worker keeps a
//! per-round [`MinerStats`]; the coordinator groups them per height and a
//! [`StatTracker`] stores the groups for queries.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// One worker's counters for a single mining round.
#[derive(Clone, Debug)]
pub struct MinerStats {
    /// Worker ID.
    pub id: usize,
    /// Nonces scored this round.
    pub total_hashes: u64,
    /// Best accepted score this round.
    pub best_score: u64,
    /// When the round started for this worker.
    pub start: DateTime<Utc>,
    /// When the worker submitted, if it has.
    pub stop: Option<DateTime<Utc>>,
}

impl MinerStats {
    /// Fresh counters for a new round, started now.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            total_hashes: 0,
            best_score: 0,
            start: Utc::now(),
            stop: None,
        }
    }

    /// Records an accepted score, keeping the best.
    pub fn record_score(&mut self, score: u64) {
        if score > self.best_score {
            self.best_score = score;
        }
    }

    /// Stamps the round's end.
    pub fn mark_stopped(&mut self) {
        self.stop = Some(Utc::now());
    }

    /// Hashes per second over the round's duration, 0.0 while running.
    pub fn hash_rate(&self) -> f64 {
        let Some(stop) = self.stop else { return 0.0 };
        let secs = (stop - self.start).num_milliseconds() as f64 / 1000.0;
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_hashes as f64 / secs
    }
}

/// All workers' counters for one height.
#[derive(Clone, Debug)]
pub struct GroupStats {
    /// Height the round mined.
    pub height: u64,
    /// Per-worker counters, keyed by worker ID.
    pub miners: HashMap<usize, MinerStats>,
}

impl GroupStats {
    /// Empty group for a height.
    pub fn new(height: u64) -> Self {
        Self {
            height,
            miners: HashMap::new(),
        }
    }

    /// Adds one worker's counters.
    pub fn insert(&mut self, stats: MinerStats) {
        self.miners.insert(stats.id, stats);
    }

    /// Sum of the workers' individual hash rates.
    pub fn total_hash_rate(&self) -> f64 {
        self.miners.values().map(MinerStats::hash_rate).sum()
    }

    /// Total nonces scored across the group.
    pub fn total_hashes(&self) -> u64 {
        self.miners.values().map(|m| m.total_hashes).sum()
    }

    /// Best score any worker accepted.
    pub fn best_score(&self) -> u64 {
        self.miners.values().map(|m| m.best_score).max().unwrap_or(0)
    }
}

/// Stores per-height group stats, newest first, and serves queries.
#[derive(Debug, Default)]
pub struct StatTracker {
    groups: Mutex<Vec<GroupStats>>,
}

impl StatTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes grouped reports until the channel closes or shutdown is
    /// signaled. Runs on its own task.
    pub async fn collect(
        &self,
        mut reports: mpsc::Receiver<GroupStats>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                group = reports.recv() => {
                    let Some(group) = group else { return };
                    info!(
                        height = group.height,
                        miners = group.miners.len(),
                        total_hashes = group.total_hashes(),
                        hash_rate = group.total_hash_rate(),
                        best_score = group.best_score(),
                        "[mining] round stats"
                    );
                    self.insert(group);
                }
            }
        }
    }

    /// Adds a group, keeping the list sorted newest first.
    pub fn insert(&self, group: GroupStats) {
        let mut groups = self.groups.lock().unwrap();
        groups.push(group);
        groups.sort_by(|a, b| b.height.cmp(&a.height));
    }

    /// The group for a height, if recorded.
    pub fn fetch(&self, height: u64) -> Option<GroupStats> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.height == height)
            .cloned()
    }

    /// Every recorded group, newest first.
    pub fn all(&self) -> Vec<GroupStats> {
        self.groups.lock().unwrap().clone()
    }
}

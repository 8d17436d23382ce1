//! # Grader Service
//!
//! Follows the block clock and grades each completed height: when the
//! first tick of a new height arrives, the previous height's submission
//! pool is fetched, filtered against the known winner lineage, graded,
//! and the resulting reward set published for the next round's record
//! templates.

use crate::grading::{grade_pool, GradedBlock};
use crate::ports::RecordPool;
use shared_types::{BlockClock, SubmittedRecord};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Chain-following grading service.
pub struct Grader {
    pool: Arc<dyn RecordPool>,
    winners_tx: watch::Sender<Vec<String>>,
    blocks: Mutex<Vec<GradedBlock>>,
}

impl Grader {
    /// Creates a grader and the winners channel the mining coordinator
    /// subscribes to. The channel starts empty; the first height's
    /// templates carry no previous winners.
    pub fn new(pool: Arc<dyn RecordPool>) -> (Arc<Self>, watch::Receiver<Vec<String>>) {
        let (winners_tx, winners_rx) = watch::channel(Vec::new());
        (
            Arc::new(Self {
                pool,
                winners_tx,
                blocks: Mutex::new(Vec::new()),
            }),
            winners_rx,
        )
    }

    /// The tick loop: grade height `h - 1` once the clock reaches `h`.
    pub async fn run(
        self: Arc<Self>,
        clock: Arc<dyn BlockClock>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticks = clock.subscribe().await;
        let mut current: Option<u64> = None;
        loop {
            let tick = tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("[grading] grader shutting down");
                        return;
                    }
                    continue;
                }
                tick = ticks.recv() => match tick {
                    Some(tick) => tick,
                    None => return,
                },
            };

            let advanced = current.map_or(true, |h| tick.height > h);
            if advanced {
                // Grade the height we just watched finish, not an
                // arbitrary predecessor: the clock may skip heights.
                if let Some(finished) = current {
                    self.grade_height(finished).await;
                }
                current = Some(tick.height);
            }
        }
    }

    /// Fetches, filters, and grades one height's pool. Failures log and
    /// sit the height out; a broken pool read must not take down the
    /// node.
    pub async fn grade_height(&self, height: u64) {
        let pool = match self.pool.records_for_height(height).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!(height, "[grading] pool read failed, sitting out: {e}");
                return;
            }
        };

        let lineage = self.winners_tx.borrow().clone();
        let eligible: Vec<SubmittedRecord> = pool
            .into_iter()
            .filter(|s| s.record.height == height)
            .filter(|s| s.record.previous_winners == lineage)
            .collect();

        let block = grade_pool(height, &eligible);
        if block.is_degenerate() {
            debug!(
                height,
                records = eligible.len(),
                "[grading] degenerate block, no reward set"
            );
            return;
        }

        info!(
            height,
            records = block.ranked.len(),
            first = %block.winners[0].short_hash(),
            "[grading] reward set selected"
        );
        let _ = self.winners_tx.send(block.winner_short_hashes());
        self.blocks.lock().unwrap().push(block);
    }

    /// The graded block for a height, if one was produced.
    pub fn block(&self, height: u64) -> Option<GradedBlock> {
        self.blocks
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.height == height)
            .cloned()
    }

    /// The most recently published winner lineage.
    pub fn current_winners(&self) -> Vec<String> {
        self.winners_tx.borrow().clone()
    }
}

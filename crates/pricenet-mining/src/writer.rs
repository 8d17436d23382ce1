//! # Record Writer
//!
//! Per-height result aggregation and durable commits. Every worker
//! attaches once and pushes its [`RankingSet`] when told to submit; the
//! writer merges the sets into the block-level top-K and writes each
//! survivor to the ledger with commit + reveal.
//!
//! One writer serves exactly one height. [`RecordWriter::next_block_writer`]
//! hands out the following height's instance, first-caller-wins, so all
//! workers of a node share the same chain of writers.

use crate::domain::{Candidate, RankingSet};
use crate::error::{MiningError, Result};
use crate::ports::LedgerClient;
use shared_types::{pow_score, OracleRecord, SubmittedRecord};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// First retry delay for a failed ledger write.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Retry delay ceiling.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Aggregates one height's worker rankings and commits the winners.
pub struct RecordWriter {
    keep: usize,
    channel_capacity: usize,
    miners: AtomicUsize,
    results_tx: mpsc::Sender<RankingSet>,
    results_rx: Mutex<Option<mpsc::Receiver<RankingSet>>>,
    template: Mutex<Option<OracleRecord>>,
    // Explicit completion flag: the collect body runs at most once per
    // height, no matter how many times or from how many tasks it is
    // invoked.
    started: AtomicBool,
    ledger: Arc<dyn LedgerClient>,
    next: Mutex<Option<Arc<RecordWriter>>>,
    shutdown: watch::Receiver<bool>,
}

impl RecordWriter {
    /// Creates a writer keeping the top `keep` records. `channel_capacity`
    /// should be the worker count so submits never block.
    pub fn new(
        keep: usize,
        channel_capacity: usize,
        ledger: Arc<dyn LedgerClient>,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<Self> {
        let (results_tx, results_rx) = mpsc::channel(channel_capacity.max(1));
        Arc::new(Self {
            keep,
            channel_capacity,
            miners: AtomicUsize::new(0),
            results_tx,
            results_rx: Mutex::new(Some(results_rx)),
            template: Mutex::new(None),
            started: AtomicBool::new(false),
            ledger,
            next: Mutex::new(None),
            shutdown,
        })
    }

    /// Registers a worker for this height and returns its result sink.
    /// Every attached worker counts toward the collection's expected
    /// total, whether or not it ever mines.
    pub fn attach(&self) -> mpsc::Sender<RankingSet> {
        self.miners.fetch_add(1, Ordering::SeqCst);
        self.results_tx.clone()
    }

    /// Number of workers attached so far.
    pub fn expected(&self) -> usize {
        self.miners.load(Ordering::SeqCst)
    }

    /// Sets the height's record template. All workers mine the same
    /// template, so the first caller wins and later calls are no-ops.
    pub fn set_template(&self, record: OracleRecord) {
        let mut template = self.template.lock().unwrap();
        if template.is_none() {
            *template = Some(record);
        }
    }

    /// The height this writer serves, if a template is set.
    pub fn height(&self) -> Option<u64> {
        self.template.lock().unwrap().as_ref().map(|t| t.height)
    }

    /// The following height's writer, created lazily. All callers get the
    /// same instance.
    pub fn next_block_writer(&self) -> Arc<RecordWriter> {
        let mut next = self.next.lock().unwrap();
        next.get_or_insert_with(|| {
            RecordWriter::new(
                self.keep,
                self.channel_capacity,
                Arc::clone(&self.ledger),
                self.shutdown.clone(),
            )
        })
        .clone()
    }

    /// Collects all expected rankings and writes the merged winners.
    ///
    /// Guarded to run its body exactly once even under concurrent calls.
    /// Blocking mode waits for the writes (used by tests and shutdown
    /// paths); non-blocking mode spawns the collection and returns.
    pub async fn collect_and_write(self: Arc<Self>, blocking: bool) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        if blocking {
            self.collect().await;
        } else {
            tokio::spawn(async move { self.collect().await });
        }
    }

    /// Gathers exactly `expected()` ranking sets, empty ones included so
    /// a worker that contributed nothing cannot stall the height, then
    /// merges and writes.
    async fn collect(self: Arc<Self>) {
        let Some(mut results) = self.results_rx.lock().unwrap().take() else {
            return;
        };
        let expected = self.expected();
        let mut shutdown = self.shutdown.clone();
        let mut gathered = Vec::with_capacity(expected);
        while gathered.len() < expected {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        warn!(
                            "[mining] collection abandoned at shutdown ({}/{} reports)",
                            gathered.len(),
                            expected
                        );
                        return;
                    }
                }
                set = results.recv() => match set {
                    Some(set) => gathered.push(set),
                    None => break,
                }
            }
        }

        let merged = RankingSet::merge(self.keep, gathered);
        let mut written = 0usize;
        for candidate in merged.entries() {
            match self.write_record(candidate).await {
                Ok(()) => written += 1,
                Err(MiningError::ShuttingDown) => return,
                Err(e) => error!("[mining] failed to write record: {e}"),
            }
        }

        info!(
            height = self.height(),
            miner_count = expected,
            exp_records = self.keep,
            records = written,
            "[mining] record block written"
        );
    }

    /// Commits one candidate's finished record, retrying transient ledger
    /// failures with exponential backoff for as long as the node runs.
    /// Rejections abandon this record only.
    async fn write_record(&self, candidate: &Candidate) -> Result<()> {
        let template = self
            .template
            .lock()
            .unwrap()
            .clone()
            .ok_or(MiningError::MissingTemplate)?;
        let record_hash = template.record_hash()?;
        let entry = SubmittedRecord {
            score: pow_score(&record_hash, &candidate.nonce),
            record: template,
            nonce: candidate.nonce.clone(),
            record_hash,
        };

        let mut shutdown = self.shutdown.clone();
        let mut delay = INITIAL_BACKOFF;
        loop {
            let outcome = async {
                self.ledger.commit(&entry).await?;
                self.ledger.reveal(&entry).await
            }
            .await;

            match outcome {
                Ok(()) => {
                    debug!(
                        height = entry.record.height,
                        score = entry.score,
                        nonce = %hex::encode(&entry.nonce),
                        "[mining] record committed"
                    );
                    return Ok(());
                }
                Err(e) if e.is_transient() => {
                    debug!("[mining] transient write failure, retrying in {delay:?}: {e}");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                return Err(MiningError::ShuttingDown);
                            }
                        }
                    }
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

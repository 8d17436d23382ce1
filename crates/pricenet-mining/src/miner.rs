//! # Mining Worker
//!
//! The worker state machine: `Paused (initial) ⇄ Mining`, driven by
//! commands on a private inbox. While mining, the loop draws a nonce from
//! its lane, scores it against the round's target, and offers it to the
//! worker's [`RankingSet`]. While paused, the inbox is the only thing the
//! worker waits on.
//!
//! A worker never talks to another worker. Results flow one way, to the
//! height's [`RecordWriter`](crate::writer::RecordWriter) sink attached by
//! command.

use crate::domain::{MinerStats, NonceSpace, RankingSet};
use crate::MINE_BATCH;
use shared_types::{pow_score, RecordHash};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

/// Commands a worker accepts on its inbox.
///
/// Data mutations (`SetTarget`, `Reset`, `SetMinimumScore`, `SetCapacity`,
/// the attachments) are valid in any state and take effect on the next
/// iteration. `Submit` pushes the current rankings without changing the
/// pause state; call sites pair it with `Pause`.
#[derive(Clone, Debug)]
pub enum MinerCommand {
    /// Record hash to mine this round.
    SetTarget(RecordHash),
    /// Start the round over: fresh nonce counter, rankings, and stats.
    Reset,
    /// Floor score below which nonces are discarded outright.
    SetMinimumScore(u64),
    /// How many candidates to retain.
    SetCapacity(usize),
    /// Where to push rankings on submit.
    AttachAggregator(mpsc::Sender<RankingSet>),
    /// Where to push the stats snapshot on submit.
    AttachStatsSink(mpsc::Sender<MinerStats>),
    /// Push the current rankings and stats to the attached sinks.
    Submit,
    /// Stop scoring until resumed.
    Pause,
    /// Start (or continue) scoring.
    Resume,
    /// Apply sub-commands back-to-back, atomically w.r.t. the loop.
    Batch(Vec<MinerCommand>),
}

/// Builder for the batched command broadcasts the coordinator sends.
#[derive(Debug, Default)]
pub struct CommandBatch {
    commands: Vec<MinerCommand>,
}

impl CommandBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an aggregator attachment.
    pub fn aggregator(mut self, sink: mpsc::Sender<RankingSet>) -> Self {
        self.commands.push(MinerCommand::AttachAggregator(sink));
        self
    }

    /// Adds a stats sink attachment.
    pub fn stats_sink(mut self, sink: mpsc::Sender<MinerStats>) -> Self {
        self.commands.push(MinerCommand::AttachStatsSink(sink));
        self
    }

    /// Adds a round reset.
    pub fn reset(mut self) -> Self {
        self.commands.push(MinerCommand::Reset);
        self
    }

    /// Adds the round's target.
    pub fn target(mut self, target: RecordHash) -> Self {
        self.commands.push(MinerCommand::SetTarget(target));
        self
    }

    /// Adds the floor score.
    pub fn minimum_score(mut self, floor: u64) -> Self {
        self.commands.push(MinerCommand::SetMinimumScore(floor));
        self
    }

    /// Adds a submit.
    pub fn submit(mut self) -> Self {
        self.commands.push(MinerCommand::Submit);
        self
    }

    /// Adds a pause.
    pub fn pause(mut self) -> Self {
        self.commands.push(MinerCommand::Pause);
        self
    }

    /// Adds a resume.
    pub fn resume(mut self) -> Self {
        self.commands.push(MinerCommand::Resume);
        self
    }

    /// The finished batch command.
    pub fn build(self) -> MinerCommand {
        MinerCommand::Batch(self.commands)
    }
}

/// Per-round mutable state, rebuilt on every `Reset`.
#[derive(Debug)]
struct MiningState {
    target: Option<RecordHash>,
    nonce: NonceSpace,
    min_accept: u64,
    capacity: usize,
    rankings: RankingSet,
    stats: MinerStats,
    results: Option<mpsc::Sender<RankingSet>>,
    stats_sink: Option<mpsc::Sender<MinerStats>>,
    submitted: bool,
}

/// One mining worker. Created paused; owned and driven by the
/// coordinator through its command channel.
#[derive(Debug)]
pub struct Miner {
    id: usize,
    commands: mpsc::Receiver<MinerCommand>,
    state: MiningState,
    paused: bool,
}

impl Miner {
    /// Creates a paused worker. The worker's lane byte is its ID.
    pub fn new(id: usize, capacity: usize, commands: mpsc::Receiver<MinerCommand>) -> Self {
        Self {
            id,
            commands,
            state: MiningState {
                target: None,
                nonce: NonceSpace::new(id as u8),
                min_accept: 0,
                capacity,
                rankings: RankingSet::new(capacity),
                stats: MinerStats::new(id),
                results: None,
                stats_sink: None,
                submitted: false,
            },
            paused: true,
        }
    }

    /// Worker ID (also the nonce lane).
    pub fn id(&self) -> usize {
        self.id
    }

    /// The mining loop. Runs until cancelled or the command channel
    /// closes. Cancellation is observed at every iteration boundary and
    /// while blocked; on exit the worker still forwards its current
    /// rankings so the height's collection never hangs on it.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            // Drain the inbox without blocking.
            loop {
                match self.commands.try_recv() {
                    Ok(command) => self.handle(command),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.forward_on_exit();
                        return;
                    }
                }
            }

            if *shutdown.borrow() {
                self.forward_on_exit();
                return;
            }

            if self.paused || self.state.target.is_none() {
                // The only point the worker yields while idle.
                tokio::select! {
                    _ = shutdown.changed() => {
                        self.forward_on_exit();
                        return;
                    }
                    command = self.commands.recv() => match command {
                        Some(command) => self.handle(command),
                        None => {
                            self.forward_on_exit();
                            return;
                        }
                    }
                }
                continue;
            }

            self.mine_batch();
            tokio::task::yield_now().await;
        }
    }

    /// Applies one command. Malformed orderings (a `Submit` with nothing
    /// attached, say) degrade to logged no-ops; nothing here can panic
    /// the loop.
    fn handle(&mut self, command: MinerCommand) {
        match command {
            MinerCommand::Batch(commands) => {
                for command in commands {
                    self.handle(command);
                }
            }
            MinerCommand::SetTarget(target) => self.state.target = Some(target),
            MinerCommand::Reset => {
                self.state.nonce.reset();
                self.state.rankings = RankingSet::new(self.state.capacity);
                self.state.stats = MinerStats::new(self.id);
                self.state.submitted = false;
            }
            MinerCommand::SetMinimumScore(floor) => self.state.min_accept = floor,
            MinerCommand::SetCapacity(capacity) => self.state.capacity = capacity,
            MinerCommand::AttachAggregator(sink) => self.state.results = Some(sink),
            MinerCommand::AttachStatsSink(sink) => self.state.stats_sink = Some(sink),
            MinerCommand::Submit => self.submit(),
            MinerCommand::Pause => self.paused = true,
            MinerCommand::Resume => self.paused = false,
        }
    }

    /// Pushes the current rankings (empty included; the aggregator's
    /// expected-count depends on it) and the stats snapshot.
    fn submit(&mut self) {
        self.state.stats.mark_stopped();
        match &self.state.results {
            Some(sink) => {
                if sink.try_send(self.state.rankings.clone()).is_err() {
                    warn!("[mining] miner {} could not push rankings", self.id);
                }
                self.state.submitted = true;
            }
            None => debug!("[mining] miner {} submit with no aggregator attached", self.id),
        }
        if let Some(sink) = &self.state.stats_sink {
            if sink.try_send(self.state.stats.clone()).is_err() {
                trace!("[mining] miner {} stats sink full", self.id);
            }
        }
    }

    /// On cancellation (or a closed inbox), a worker that was attached to
    /// an aggregator but has not submitted this round still pushes its
    /// rankings, so the collection's expected-count works out.
    fn forward_on_exit(&mut self) {
        if self.state.submitted {
            return;
        }
        if let Some(sink) = self.state.results.take() {
            let _ = sink.try_send(self.state.rankings.clone());
            self.state.submitted = true;
        }
    }

    /// Scores a batch of nonces. Bounded so the task stays cooperative
    /// inside the runtime.
    fn mine_batch(&mut self) {
        let Some(target) = self.state.target else { return };
        for _ in 0..MINE_BATCH {
            let nonce = self.state.nonce.next();
            let score = pow_score(&target, nonce);
            self.state.stats.total_hashes += 1;
            if score > self.state.min_accept && self.state.rankings.insert(nonce, score) {
                self.state.stats.record_score(score);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::COMMAND_BUFFER;
    use std::time::Duration;
    use tokio::time::timeout;

    fn spawn_miner(
        id: usize,
        capacity: usize,
    ) -> (
        mpsc::Sender<MinerCommand>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let miner = Miner::new(id, capacity, command_rx);
        let handle = tokio::spawn(miner.run(shutdown_rx));
        (command_tx, shutdown_tx, handle)
    }

    #[tokio::test]
    async fn test_starts_paused_and_submits_deterministic_best() {
        let (commands, shutdown, handle) = spawn_miner(1, 5);
        let (results_tx, mut results_rx) = mpsc::channel(1);

        let target = [0xabu8; 32];
        commands
            .send(
                CommandBatch::new()
                    .aggregator(results_tx)
                    .reset()
                    .target(target)
                    .resume()
                    .build(),
            )
            .await
            .unwrap();

        // Let it mine briefly, then stop and submit.
        tokio::time::sleep(Duration::from_millis(50)).await;
        commands
            .send(CommandBatch::new().submit().pause().build())
            .await
            .unwrap();

        let rankings = timeout(Duration::from_secs(5), results_rx.recv())
            .await
            .expect("submit should arrive")
            .expect("channel open");
        assert!(!rankings.is_empty());

        // Every retained candidate really scores what it claims, on this
        // worker's lane.
        for candidate in rankings.entries() {
            assert_eq!(candidate.nonce[0], 1);
            assert_eq!(pow_score(&target, &candidate.nonce), candidate.score);
        }

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_before_reset_does_not_crash() {
        let (commands, shutdown, handle) = spawn_miner(2, 5);
        let (results_tx, mut results_rx) = mpsc::channel(1);

        // Submit with no target, no reset: must forward an empty set.
        commands
            .send(MinerCommand::AttachAggregator(results_tx))
            .await
            .unwrap();
        commands.send(MinerCommand::Submit).await.unwrap();

        let rankings = timeout(Duration::from_secs(5), results_rx.recv())
            .await
            .expect("empty submit should still arrive")
            .expect("channel open");
        assert!(rankings.is_empty());

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_forwards_pending_rankings() {
        let (commands, shutdown, handle) = spawn_miner(3, 5);
        let (results_tx, mut results_rx) = mpsc::channel(1);

        // Attached but never resumed: cancellation must still produce a
        // (empty) report.
        commands
            .send(MinerCommand::AttachAggregator(results_tx))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        shutdown.send(true).unwrap();
        handle.await.unwrap();

        let rankings = timeout(Duration::from_secs(1), results_rx.recv())
            .await
            .expect("cancelled worker should still report")
            .expect("channel open");
        assert!(rankings.is_empty());
    }

    #[tokio::test]
    async fn test_pause_stops_hashing() {
        let (commands, shutdown, handle) = spawn_miner(4, 5);
        let (stats_tx, mut stats_rx) = mpsc::channel(2);

        commands
            .send(
                CommandBatch::new()
                    .stats_sink(stats_tx)
                    .reset()
                    .target([1u8; 32])
                    .resume()
                    .build(),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        commands
            .send(CommandBatch::new().submit().pause().build())
            .await
            .unwrap();

        let first = timeout(Duration::from_secs(5), stats_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(first.total_hashes > 0);

        // Paused: hash count must not advance.
        tokio::time::sleep(Duration::from_millis(50)).await;
        commands.send(MinerCommand::Submit).await.unwrap();
        let second = timeout(Duration::from_secs(5), stats_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.total_hashes, second.total_hashes);

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_clears_rankings_between_rounds() {
        let (commands, shutdown, handle) = spawn_miner(5, 5);
        let (results_tx, mut results_rx) = mpsc::channel(2);

        commands
            .send(
                CommandBatch::new()
                    .aggregator(results_tx.clone())
                    .reset()
                    .target([2u8; 32])
                    .resume()
                    .build(),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        commands
            .send(CommandBatch::new().submit().pause().build())
            .await
            .unwrap();
        let first = timeout(Duration::from_secs(5), results_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!first.is_empty());

        // New round: reset without resuming, then submit immediately.
        commands
            .send(
                CommandBatch::new()
                    .aggregator(results_tx)
                    .reset()
                    .target([3u8; 32])
                    .build(),
            )
            .await
            .unwrap();
        commands.send(MinerCommand::Submit).await.unwrap();
        let second = timeout(Duration::from_secs(5), results_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(second.is_empty());

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }
}

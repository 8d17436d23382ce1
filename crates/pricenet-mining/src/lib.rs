//! # PriceNet - Mining Subsystem
//!
//! **Bounded Context:** Oracle Record Mining
//!
//! ## Purpose
//!
//! Runs the per-block proof-of-work race:
//! - A pool of worker tasks ([`Miner`]) scores nonces against the height's
//!   record hash, each keeping its top-K candidates in a [`RankingSet`]
//! - A [`Coordinator`] drives the pool off the foreign ledger's block
//!   cadence: mining starts at minute 1 and stops at minute 9
//! - A [`RecordWriter`] merges the workers' rankings into the block-level
//!   top-K and durably commits each survivor to the ledger exactly once
//!
//! ## Key Design Principles
//!
//! 1. **No shared mutable state**: each worker exclusively owns its ranking
//!    set and nonce space; commands arrive on a private inbox
//! 2. **Disjoint nonce lanes**: a worker's lane byte partitions the nonce
//!    space, so merged rankings never collide
//! 3. **Exactly-once commits**: the writer's collect body runs once per
//!    height under an atomic completion flag
//! 4. **Bounded collection**: every attached worker reports (an empty
//!    ranking set counts), so collection cannot hang on a quiet worker
//!
//! ## Critical Invariants
//!
//! 1. **Ranking floor**: a full ranking set never accepts a score at or
//!    below its current minimum
//! 2. **Nonce disjointness**: nonces are unique within a worker's lifetime
//!    and across workers
//! 3. **Edge-triggered lifecycle**: repeated ticks of the same minute are
//!    no-ops
//! 4. **Retry isolation**: one record's failing write never blocks or
//!    rolls back the others
//!
//! ## Module Structure
//!
//! - [`domain`]: pure mining state (ranking, nonce space, stats)
//! - [`miner`]: the worker state machine and its command protocol
//! - [`coordinator`]: block-lifecycle orchestration of the worker pool
//! - [`writer`]: result aggregation and durable ledger commits
//! - [`ports`]: outbound interfaces (price source, ledger client)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod domain;
pub mod miner;
pub mod ports;
pub mod writer;

mod config;
mod error;

pub use config::MiningConfig;
pub use error::{MiningError, Result};

pub use coordinator::Coordinator;
pub use domain::{Candidate, GroupStats, MinerStats, NonceSpace, RankingSet, StatTracker};
pub use miner::{CommandBatch, Miner, MinerCommand};
pub use ports::{LedgerClient, PriceSource};
pub use writer::RecordWriter;

/// Default number of records a node submits per block.
pub const DEFAULT_RECORDS_PER_BLOCK: usize = 3;

/// Capacity of each worker's command inbox.
pub const COMMAND_BUFFER: usize = 10;

/// Nonces a worker scores between inbox drains and scheduler yields.
pub const MINE_BATCH: usize = 256;

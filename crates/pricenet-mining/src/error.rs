//! Error types for the mining subsystem.

use shared_types::{LedgerError, RecordError};
use thiserror::Error;

/// Result type alias for mining operations.
pub type Result<T> = std::result::Result<T, MiningError>;

/// Errors that can occur while coordinating or writing a mining round.
#[derive(Debug, Error)]
pub enum MiningError {
    /// Invalid configuration (fatal at startup).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The price source failed; the height is sat out.
    #[error("price snapshot failed: {0}")]
    Snapshot(String),

    /// The price source returned a partial snapshot.
    #[error("partial price snapshot: {missing} registry assets missing")]
    PartialSnapshot {
        /// Number of registry assets absent from the snapshot.
        missing: usize,
    },

    /// Ledger interaction failed.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// Record construction or validation failed.
    #[error("record: {0}")]
    Record(#[from] RecordError),

    /// A write was attempted before the height's template was set.
    #[error("no record template set")]
    MissingTemplate,

    /// The block clock stream ended.
    #[error("block clock stream closed")]
    ClockClosed,

    /// Shutdown was signaled while an operation was in flight.
    #[error("shutting down")]
    ShuttingDown,
}

//! Error types for the grading subsystem.

use shared_types::LedgerError;
use thiserror::Error;

/// Result type alias for grading operations.
pub type Result<T> = std::result::Result<T, GradingError>;

/// Errors that can occur while following the chain and grading heights.
///
/// The pure algorithm itself never fails (undersized pools grade to a
/// degenerate block), so everything here is about fetching pools.
#[derive(Debug, Error)]
pub enum GradingError {
    /// The submission pool could not be read for a height.
    #[error("pool read failed: {0}")]
    Pool(#[from] LedgerError),

    /// The block clock stream ended.
    #[error("block clock stream closed")]
    ClockClosed,
}

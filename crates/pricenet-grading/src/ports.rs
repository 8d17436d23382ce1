//! Outbound ports of the grading subsystem.

use async_trait::async_trait;
use shared_types::{LedgerError, SubmittedRecord};

/// Port: read the full submission pool the ledger holds for a height,
/// every node's records rather than just this node's.
#[async_trait]
pub trait RecordPool: Send + Sync {
    /// All records visible on the ledger for `height`.
    async fn records_for_height(
        &self,
        height: u64,
    ) -> std::result::Result<Vec<SubmittedRecord>, LedgerError>;
}

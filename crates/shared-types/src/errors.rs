//! Shared error types.

use thiserror::Error;

/// Errors from the external ledger client.
///
/// The transient/rejected split drives the writer's retry policy: transient
/// failures are retried with backoff, rejections abandon the one record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger was unreachable or timed out; the operation may succeed
    /// if retried.
    #[error("transient ledger failure: {0}")]
    Transient(String),

    /// The ledger rejected the payload; retrying cannot help.
    #[error("ledger rejected submission: {0}")]
    Rejected(String),

    /// The queried address or height is unknown to the ledger.
    #[error("not found: {0}")]
    NotFound(String),
}

impl LedgerError {
    /// True if the operation is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors from constructing or checking an oracle record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The record could not be serialized to canonical JSON.
    #[error("record serialization failed: {0}")]
    Serialization(String),

    /// The assets map does not have the registry's size.
    #[error("asset set mismatch: expected {expected} assets, found {found}")]
    AssetSetMismatch {
        /// Registry size.
        expected: usize,
        /// Number of assets in the record.
        found: usize,
    },

    /// A registry asset is missing from the record.
    #[error("missing asset {0}")]
    MissingAsset(String),

    /// The previous-winners field is neither empty nor full-length.
    #[error("malformed winners field: found {found} entries")]
    MalformedWinners {
        /// Number of winner entries present.
        found: usize,
    },
}

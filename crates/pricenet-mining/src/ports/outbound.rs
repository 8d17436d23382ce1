//! Outbound ports (driven side).
//!
//! The live implementations (exchange pollers, the foreign-ledger RPC
//! client) live outside this crate; in-memory adapters back the dev node
//! and the test suite.

use crate::error::Result;
use async_trait::async_trait;
use shared_types::{LedgerError, PriceSnapshot, SubmittedRecord};

/// Port: fetch a point-in-time price snapshot.
///
/// A failed or partial snapshot aborts the height's mining attempt; the
/// coordinator retries on the next block rather than mining a bad
/// template.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current prices for the full asset registry.
    async fn snapshot(&self) -> Result<PriceSnapshot>;
}

/// Port: the foreign ledger this node submits records to.
///
/// A record only counts as written once both `commit` and `reveal`
/// succeed.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Stage a record entry on the ledger.
    async fn commit(&self, entry: &SubmittedRecord) -> std::result::Result<(), LedgerError>;

    /// Reveal a previously committed entry, making it visible.
    async fn reveal(&self, entry: &SubmittedRecord) -> std::result::Result<(), LedgerError>;

    /// Spendable balance of an address, in base units.
    async fn balance(&self, address: &str) -> std::result::Result<u64, LedgerError>;
}

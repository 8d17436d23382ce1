//! # Shared Types Crate
//!
//! Domain entities shared across the PriceNet subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary
//!   lives here: the oracle record, the asset registry, block ticks, and
//!   the proof-of-work score function.
//! - **Canonical Serialization**: an [`OracleRecord`] always serializes to
//!   the same bytes for the same content (`BTreeMap` assets, fixed field
//!   order), so its hash is stable across nodes.

pub mod assets;
pub mod clock;
pub mod entities;
pub mod errors;
pub mod pow;

pub use assets::{asset_registry, ASSET_REGISTRY};
pub use clock::{BlockClock, BlockTick};
pub use entities::{OracleRecord, PriceSnapshot, RecordHash, SubmittedRecord};
pub use errors::{LedgerError, RecordError};
pub use pow::pow_score;

/// Scale factor for fixed-point asset prices: 1 unit = 1e-8.
pub const PRICE_SCALE: u64 = 100_000_000;

/// Number of winners carried in a record's previous-winners field.
pub const WINNER_COUNT: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_scale() {
        assert_eq!(PRICE_SCALE, 100_000_000);
    }

    #[test]
    fn test_winner_count() {
        assert_eq!(WINNER_COUNT, 10);
    }
}

//! Outbound ports of the mining subsystem.

mod outbound;

pub use outbound::{LedgerClient, PriceSource};

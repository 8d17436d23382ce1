//! # Block Clock
//!
//! The foreign ledger's cadence, as observed by this node. Each block
//! (height) is split into ten minutes (0–9); both the mining coordinator
//! and the grader key their lifecycles off these ticks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One observed advance of the foreign ledger.
///
/// Heights are monotonically non-decreasing; minutes cycle 0–9 within a
/// height. Delivery is FIFO per subscriber only; no cross-subscriber
/// ordering is promised.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTick {
    /// Index of the foreign-ledger block.
    pub height: u64,
    /// Sub-phase of the block, 0 through 9.
    pub minute: u8,
}

/// Port: source of block ticks.
#[async_trait]
pub trait BlockClock: Send + Sync {
    /// Open a new tick stream. Each subscriber gets its own FIFO channel.
    async fn subscribe(&self) -> mpsc::Receiver<BlockTick>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_equality() {
        let a = BlockTick { height: 7, minute: 1 };
        let b = BlockTick { height: 7, minute: 1 };
        assert_eq!(a, b);
        assert_ne!(a, BlockTick { height: 7, minute: 9 });
    }
}

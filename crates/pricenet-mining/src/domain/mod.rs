//! Pure mining domain state: candidate ranking, nonce spaces, and
//! per-round statistics. Nothing in here touches a channel or a port.

mod nonce;
mod ranking;
mod stats;

pub use nonce::NonceSpace;
pub use ranking::{Candidate, RankingSet};
pub use stats::{GroupStats, MinerStats, StatTracker};

//! Configuration for the mining subsystem.

use crate::error::{MiningError, Result};
use serde::Deserialize;

/// Runtime configuration for the mining coordinator and its worker pool.
#[derive(Clone, Debug, Deserialize)]
pub struct MiningConfig {
    /// Number of worker tasks (default: one per CPU).
    pub num_miners: usize,

    /// How many records to keep and submit per block.
    pub records_per_block: usize,

    /// Floor score below which a worker discards a nonce outright.
    pub minimum_score: u64,

    /// Identity string stamped into every record this node produces.
    pub miner_id: String,

    /// Address the block reward is paid to; also the account whose balance
    /// gates mining.
    pub coinbase_address: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            num_miners: num_cpus::get(),
            records_per_block: crate::DEFAULT_RECORDS_PER_BLOCK,
            minimum_score: 0,
            miner_id: String::new(),
            coinbase_address: String::new(),
        }
    }
}

impl MiningConfig {
    /// Startup validation. Failures here are fatal; there is no runtime
    /// recovery from a bad configuration.
    pub fn validate(&self) -> Result<()> {
        if self.num_miners == 0 {
            return Err(MiningError::InvalidConfig(
                "num_miners must be at least 1".to_string(),
            ));
        }
        // Worker IDs double as nonce lane bytes.
        if self.num_miners > u8::MAX as usize {
            return Err(MiningError::InvalidConfig(format!(
                "num_miners must fit a nonce lane byte (max {})",
                u8::MAX
            )));
        }
        if self.records_per_block == 0 {
            return Err(MiningError::InvalidConfig(
                "records_per_block must be at least 1".to_string(),
            ));
        }
        if self.miner_id.is_empty() {
            return Err(MiningError::InvalidConfig(
                "miner_id must be set".to_string(),
            ));
        }
        if self.coinbase_address.is_empty() {
            return Err(MiningError::InvalidConfig(
                "coinbase_address must be set".to_string(),
            ));
        }
        Ok(())
    }
}

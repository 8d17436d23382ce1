//! # Core Domain Entities
//!
//! The oracle record and its ledger-visible form.
//!
//! ## Clusters
//!
//! - **Record**: [`OracleRecord`], [`SubmittedRecord`], [`RecordHash`]
//! - **Prices**: [`PriceSnapshot`]

use crate::assets::ASSET_REGISTRY;
use crate::errors::RecordError;
use crate::WINNER_COUNT;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A 32-byte SHA-256 hash.
pub type RecordHash = [u8; 32];

/// The record body every worker of one node mines for one height.
///
/// Serialization is canonical: the assets map is a `BTreeMap` so the JSON
/// content (and therefore [`OracleRecord::record_hash`]) is identical for
/// identical records regardless of construction order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRecord {
    /// Address the block reward is paid to.
    #[serde(rename = "coinbase")]
    pub coinbase_address: String,

    /// Foreign-ledger block height this record targets.
    pub height: u64,

    /// Short hashes of the previous height's ten winners, in reward order.
    /// Empty when no prior graded block is known.
    #[serde(rename = "winners")]
    pub previous_winners: Vec<String>,

    /// Identity of the node that produced the record.
    #[serde(rename = "minerid")]
    pub miner_id: String,

    /// Fixed-point (1e8) price per registry asset.
    pub assets: BTreeMap<String, u64>,
}

impl OracleRecord {
    /// Canonical JSON content of the record.
    pub fn content(&self) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec(self).map_err(|e| RecordError::Serialization(e.to_string()))
    }

    /// SHA-256 of the canonical content. This is the mining target.
    pub fn record_hash(&self) -> Result<RecordHash, RecordError> {
        let content = self.content()?;
        Ok(Sha256::digest(&content).into())
    }

    /// Structural sanity checks: the assets map must match the registry
    /// exactly, and the winners field must be empty or full-length.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.assets.len() != ASSET_REGISTRY.len() {
            return Err(RecordError::AssetSetMismatch {
                expected: ASSET_REGISTRY.len(),
                found: self.assets.len(),
            });
        }
        for code in ASSET_REGISTRY {
            if !self.assets.contains_key(*code) {
                return Err(RecordError::MissingAsset((*code).to_string()));
            }
        }
        if !self.previous_winners.is_empty() && self.previous_winners.len() != WINNER_COUNT {
            return Err(RecordError::MalformedWinners {
                found: self.previous_winners.len(),
            });
        }
        Ok(())
    }
}

/// One ledger-visible submission: a record plus the nonce that scored it.
///
/// The score is self-reported by the submitting node; the grader recomputes
/// it and discards mismatches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedRecord {
    /// The record body.
    pub record: OracleRecord,

    /// Nonce the submitting worker found.
    pub nonce: Vec<u8>,

    /// Hash of the record body (the mining target the nonce was scored
    /// against).
    pub record_hash: RecordHash,

    /// Self-reported proof-of-work score.
    pub score: u64,
}

impl SubmittedRecord {
    /// Hex encoding of the first 8 hash bytes, the form winners are
    /// referenced by in the next height's records.
    pub fn short_hash(&self) -> String {
        hex::encode(&self.record_hash[..8])
    }
}

/// A point-in-time reading of every registry asset's price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Fixed-point (1e8) price per asset code.
    pub prices: BTreeMap<String, u64>,

    /// Unix timestamp of the reading.
    pub timestamp: i64,
}

impl PriceSnapshot {
    /// True if the snapshot prices exactly the asset registry.
    pub fn is_complete(&self) -> bool {
        self.prices.len() == ASSET_REGISTRY.len()
            && ASSET_REGISTRY.iter().all(|code| self.prices.contains_key(*code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_registry;
    use crate::PRICE_SCALE;

    fn test_record() -> OracleRecord {
        OracleRecord {
            coinbase_address: "PN-coinbase-1".to_string(),
            height: 42,
            previous_winners: vec![],
            miner_id: "node-a".to_string(),
            assets: asset_registry().map(|c| (c.to_string(), PRICE_SCALE)).collect(),
        }
    }

    #[test]
    fn test_record_hash_is_stable() {
        let record = test_record();
        assert_eq!(record.record_hash().unwrap(), record.record_hash().unwrap());
    }

    #[test]
    fn test_record_hash_tracks_content() {
        let record = test_record();
        let mut other = record.clone();
        other.assets.insert("USD".to_string(), 2 * PRICE_SCALE);
        assert_ne!(record.record_hash().unwrap(), other.record_hash().unwrap());
    }

    #[test]
    fn test_validate_accepts_full_registry() {
        assert!(test_record().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_asset() {
        let mut record = test_record();
        record.assets.remove("USD");
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_foreign_asset() {
        let mut record = test_record();
        record.assets.remove("USD");
        record.assets.insert("XPD".to_string(), PRICE_SCALE);
        assert!(matches!(
            record.validate(),
            Err(RecordError::MissingAsset(_))
        ));
    }

    #[test]
    fn test_validate_rejects_short_winner_list() {
        let mut record = test_record();
        record.previous_winners = vec!["aabbccdd00112233".to_string(); 4];
        assert!(matches!(
            record.validate(),
            Err(RecordError::MalformedWinners { found: 4 })
        ));
    }

    #[test]
    fn test_snapshot_completeness() {
        let full = PriceSnapshot {
            prices: asset_registry().map(|c| (c.to_string(), PRICE_SCALE)).collect(),
            timestamp: 0,
        };
        assert!(full.is_complete());

        let mut partial = full.clone();
        partial.prices.remove("ETH");
        assert!(!partial.is_complete());
    }
}

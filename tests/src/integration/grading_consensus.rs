//! # Grading Consensus
//!
//! Grading is the implicit consensus: independent nodes reading the same
//! submission pool must select byte-identical reward sets. These tests
//! run separate grader instances, with separately shuffled pool reads,
//! against one pool and compare their outputs exactly.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pricenet_grading::{grade_pool, Grader, RecordPool};
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use shared_types::{
        asset_registry, pow_score, LedgerError, OracleRecord, SubmittedRecord, PRICE_SCALE,
    };
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// A pool reader that returns the same records in a caller-specific
    /// order. The ledger makes no ordering promise, so honest nodes can
    /// legitimately observe different orders.
    struct ShuffledPool {
        records: Vec<SubmittedRecord>,
        seed: u64,
        reads: Mutex<u64>,
    }

    #[async_trait]
    impl RecordPool for ShuffledPool {
        async fn records_for_height(
            &self,
            _height: u64,
        ) -> Result<Vec<SubmittedRecord>, LedgerError> {
            let mut records = self.records.clone();
            let mut reads = self.reads.lock().unwrap();
            *reads += 1;
            let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed.wrapping_add(*reads));
            records.shuffle(&mut rng);
            Ok(records)
        }
    }

    fn submission(height: u64, lane: u8, spread: u64) -> SubmittedRecord {
        let assets: BTreeMap<String, u64> = asset_registry()
            .map(|c| (c.to_string(), 100 * PRICE_SCALE + spread * (lane as u64)))
            .collect();
        let record = OracleRecord {
            coinbase_address: format!("PN-coinbase-{lane}"),
            height,
            previous_winners: vec![],
            miner_id: format!("node-{lane}"),
            assets,
        };
        let record_hash = record.record_hash().unwrap();
        let nonce = vec![lane, 1];
        SubmittedRecord {
            score: pow_score(&record_hash, &nonce),
            record,
            nonce,
            record_hash,
        }
    }

    fn cross_node_pool(height: u64, nodes: u8) -> Vec<SubmittedRecord> {
        (0..nodes)
            .map(|lane| submission(height, lane, PRICE_SCALE / 50))
            .collect()
    }

    #[tokio::test]
    async fn test_independent_graders_agree_byte_for_byte() {
        let records = cross_node_pool(6, 23);

        let pool_a = Arc::new(ShuffledPool {
            records: records.clone(),
            seed: 1,
            reads: Mutex::new(0),
        });
        let pool_b = Arc::new(ShuffledPool {
            records,
            seed: 999,
            reads: Mutex::new(0),
        });

        let (grader_a, _winners_a) = Grader::new(pool_a);
        let (grader_b, _winners_b) = Grader::new(pool_b);
        grader_a.grade_height(6).await;
        grader_b.grade_height(6).await;

        let block_a = grader_a.block(6).expect("graded");
        let block_b = grader_b.block(6).expect("graded");

        // The serialized reward sets must match exactly.
        let winners_a = serde_json::to_vec(&block_a.winner_short_hashes()).unwrap();
        let winners_b = serde_json::to_vec(&block_b.winner_short_hashes()).unwrap();
        assert_eq!(winners_a, winners_b);

        // So must the full audit rankings.
        let ranked_a: Vec<String> = block_a.ranked.iter().map(|r| r.short_hash()).collect();
        let ranked_b: Vec<String> = block_b.ranked.iter().map(|r| r.short_hash()).collect();
        assert_eq!(ranked_a, ranked_b);
    }

    #[tokio::test]
    async fn test_pure_grade_matches_service_grade() {
        let records = cross_node_pool(7, 15);
        let pool = Arc::new(ShuffledPool {
            records: records.clone(),
            seed: 42,
            reads: Mutex::new(0),
        });

        let (grader, _winners) = Grader::new(pool);
        grader.grade_height(7).await;
        let via_service = grader.block(7).expect("graded");

        let via_function = grade_pool(7, &records);
        assert_eq!(
            via_service.winner_short_hashes(),
            via_function.winner_short_hashes()
        );
    }

    #[tokio::test]
    async fn test_small_cross_node_pool_is_degenerate_everywhere() {
        // Nine submissions: every node must agree there are no winners.
        let records = cross_node_pool(8, 9);
        for seed in [3u64, 17, 99] {
            let pool = Arc::new(ShuffledPool {
                records: records.clone(),
                seed,
                reads: Mutex::new(0),
            });
            let (grader, winners) = Grader::new(pool);
            grader.grade_height(8).await;
            assert!(grader.block(8).is_none());
            assert!(winners.borrow().is_empty());
        }
    }
}

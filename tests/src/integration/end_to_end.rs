//! # End-to-End Mining Flow
//!
//! Runs a whole node against the simulated clock and checks the full
//! choreography: workers mine a height, the writer commits and reveals
//! the top records, the grader grades the finished height, and the next
//! height's records carry the winners forward.

#[cfg(test)]
mod tests {
    use pricenet_mining::MiningConfig;
    use pricenet_node::{NodeConfig, NodeRuntime};
    use shared_types::WINNER_COUNT;
    use std::time::Duration;
    use tokio::time::timeout;

    /// A node that submits enough records per block to make its own
    /// height gradeable (a pool needs ten records).
    fn gradeable_config() -> NodeConfig {
        NodeConfig {
            mining: MiningConfig {
                num_miners: 2,
                records_per_block: 12,
                minimum_score: 0,
                miner_id: "e2e-node".to_string(),
                coinbase_address: "PN-coinbase-e2e".to_string(),
            },
            minute_interval: Duration::from_millis(10),
            dev_balance: 1_000,
        }
    }

    #[tokio::test]
    async fn test_mined_height_is_committed_and_graded() {
        let runtime = NodeRuntime::new(gradeable_config()).unwrap();
        runtime.start().await.unwrap();
        let ledger = runtime.ledger();
        let grader = runtime.grader();

        // An early height must produce its 12 revealed records. (Exactly
        // which height is first depends on startup timing, so scan.)
        let mined = timeout(Duration::from_secs(60), async {
            loop {
                if let Some(height) = (1..=20u64).find(|h| ledger.revealed_count(*h) >= 12) {
                    return height;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("an early height should reveal records");

        // Once the clock moves on, that height gets graded: ten winners
        // out of the twelve submissions.
        let block = timeout(Duration::from_secs(60), async {
            loop {
                if let Some(block) = grader.block(mined) {
                    return block;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("the mined height should be graded");

        assert_eq!(block.winners.len(), WINNER_COUNT);
        assert_eq!(block.ranked.len(), 12);
        // Scores in the reveal pool are honest: grading recomputed and
        // kept all of them.
        assert!(block.winners.iter().all(|w| w.score > 0));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_reward_set_seeds_the_next_height() {
        let runtime = NodeRuntime::new(gradeable_config()).unwrap();
        runtime.start().await.unwrap();
        let ledger = runtime.ledger();
        let grader = runtime.grader();

        // Some later height's records must carry a full winner lineage.
        // (The exact height depends on when grading lands relative to the
        // next template build, so scan forward.)
        let carried = timeout(Duration::from_secs(120), async {
            loop {
                for height in 2..=20u64 {
                    let record = ledger
                        .revealed_at(height)
                        .into_iter()
                        .find(|r| r.record.previous_winners.len() == WINNER_COUNT);
                    if let Some(record) = record {
                        return record;
                    }
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("a later height should carry previous winners");

        // The lineage the record carries is exactly some graded height's
        // reward set.
        let lineage = carried.record.previous_winners.clone();
        let matched = (1..=20u64).filter_map(|h| grader.block(h)).any(|block| {
            block.winner_short_hashes() == lineage
        });
        assert!(matched, "carried lineage must match a graded reward set");

        runtime.shutdown().await;
    }
}

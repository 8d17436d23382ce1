//! # Grading Algorithm
//!
//! The elimination tournament that ranks a height's record pool.
//!
//! ## Invariants Enforced
//!
//! - Grading an immutable pool is idempotent: identical input, in any
//!   order, yields an identical ranking, byte for byte
//! - Fewer than ten valid records grade to a degenerate (empty) block
//! - Every comparison is a total order: record hash ascending breaks all
//!   remaining ties, and `f64::total_cmp` keeps float comparison exact
//!
//! ## The tournament
//!
//! The pool is cut to the 50 best scores, then shrunk one record per
//! round: each round recomputes the surviving set's per-asset mean,
//! grades every survivor by its quartic distance from that mean, and
//! drops the worst. The mean drifts round to round on purpose; it is
//! always the mean of the *current* survivors. The quartic is
//! deliberately outlier-punishing: one mispriced asset dominates the
//! grade.

use crate::{GRADE_POOL_CAP, REWARD_SET_SIZE};
use shared_types::{pow_score, SubmittedRecord, PRICE_SCALE};
use std::collections::HashSet;

/// One record with its tournament results.
#[derive(Clone, Debug)]
pub struct GradedRecord {
    /// The ledger-visible submission.
    pub submitted: SubmittedRecord,
    /// Recomputed proof-of-work score.
    pub score: u64,
    /// Quartic distance from the surviving set's mean at the record's
    /// final round.
    pub grade: f64,
}

impl GradedRecord {
    /// Short hash of the underlying record.
    pub fn short_hash(&self) -> String {
        self.submitted.short_hash()
    }
}

/// The deterministic output of grading one height.
#[derive(Clone, Debug, Default)]
pub struct GradedBlock {
    /// Height the pool was graded for.
    pub height: u64,
    /// The reward set: the ten survivors in reward order. Empty for a
    /// degenerate block.
    pub winners: Vec<GradedRecord>,
    /// Audit list: the full pre-truncation ordering, eliminated records
    /// frozen at the position they dropped out.
    pub ranked: Vec<GradedRecord>,
}

impl GradedBlock {
    /// A degenerate block: nothing to reward.
    pub fn degenerate(height: u64) -> Self {
        Self {
            height,
            winners: Vec::new(),
            ranked: Vec::new(),
        }
    }

    /// True if the pool was too small to grade.
    pub fn is_degenerate(&self) -> bool {
        self.winners.is_empty()
    }

    /// The winners' short hashes, in reward order. This is the value the
    /// next height's record templates carry.
    pub fn winner_short_hashes(&self) -> Vec<String> {
        self.winners.iter().map(GradedRecord::short_hash).collect()
    }
}

/// Grades a height's full submission pool.
///
/// Pure and deterministic: no state survives the call, and shuffling the
/// input changes nothing. Malformed records (wrong asset set, misreported
/// score) and duplicate submissions are dropped before the tournament.
pub fn grade_pool(height: u64, pool: &[SubmittedRecord]) -> GradedBlock {
    let mut graded: Vec<GradedRecord> = dedup(pool)
        .into_iter()
        .filter(|s| s.record.validate().is_ok())
        .filter_map(|s| {
            let score = pow_score(&s.record_hash, &s.nonce);
            // A misreported score is a protocol violation; drop it.
            (score == s.score).then(|| GradedRecord {
                submitted: s.clone(),
                score,
                grade: 0.0,
            })
        })
        .collect();

    if graded.len() < REWARD_SET_SIZE {
        return GradedBlock::degenerate(height);
    }

    // Cut to the 50 best scores under a total order.
    graded.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.submitted.record_hash.cmp(&b.submitted.record_hash))
    });
    graded.truncate(GRADE_POOL_CAP);

    // One elimination per round; the i == REWARD_SET_SIZE round orders
    // the final ten without dropping anyone.
    for i in (REWARD_SET_SIZE..=graded.len()).rev() {
        let means = asset_means(&graded[..i]);
        for record in graded[..i].iter_mut() {
            record.grade = quartic_distance(record, &means);
        }
        graded[..i].sort_by(|a, b| {
            a.grade
                .total_cmp(&b.grade)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.submitted.record_hash.cmp(&b.submitted.record_hash))
        });
    }

    let winners = graded[..REWARD_SET_SIZE].to_vec();
    GradedBlock {
        height,
        winners,
        ranked: graded,
    }
}

/// Drops duplicate (nonce, record hash) submissions, keeping the first.
fn dedup(pool: &[SubmittedRecord]) -> Vec<&SubmittedRecord> {
    let mut seen = HashSet::new();
    pool.iter()
        .filter(|s| {
            let mut key = s.nonce.clone();
            key.extend_from_slice(&s.record_hash);
            seen.insert(key)
        })
        .collect()
}

/// Per-asset mean of the surviving set, in registry (BTreeMap) order.
fn asset_means(survivors: &[GradedRecord]) -> Vec<(String, f64)> {
    let n = survivors.len() as f64;
    survivors[0]
        .submitted
        .record
        .assets
        .keys()
        .map(|code| {
            let sum: f64 = survivors
                .iter()
                .map(|r| as_price(r.submitted.record.assets[code]))
                .sum();
            (code.clone(), sum / n)
        })
        .collect()
}

/// Sum over assets of the fourth power of the distance from the mean.
fn quartic_distance(record: &GradedRecord, means: &[(String, f64)]) -> f64 {
    means
        .iter()
        .map(|(code, mean)| {
            let d = as_price(record.submitted.record.assets[code]) - mean;
            d.powi(4)
        })
        .sum()
}

/// Fixed-point to double, the one conversion point shared by mean and
/// grade so every node rounds identically.
fn as_price(fixed: u64) -> f64 {
    fixed as f64 / PRICE_SCALE as f64
}

//! # Candidate Ranking
//!
//! A bounded, score-ordered collection that retains only the K best
//! (nonce, score) candidates seen so far.
//!
//! ## Invariants Enforced
//!
//! - Entries are always sorted by score, highest first, length ≤ capacity
//! - Once full, an insert at or below the current floor is rejected
//!   unchanged; an accepted insert evicts the floor
//! - Equal scores keep the earlier-inserted entry ahead (stable)
//!
//! The floor rule is load-bearing: a late or slow result must never
//! regress a block's already-decided top-K.

/// One scored trial value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// The nonce bytes, lane byte first.
    pub nonce: Vec<u8>,
    /// Proof-of-work score of the nonce against the round's target.
    pub score: u64,
}

/// Bounded top-K ranking of candidates, ordered by score descending.
#[derive(Clone, Debug, Default)]
pub struct RankingSet {
    capacity: usize,
    entries: Vec<Candidate>,
}

impl RankingSet {
    /// Creates an empty ranking retaining at most `capacity` candidates.
    /// Capacity 0 accepts nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of candidates retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of candidates currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no candidates are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The lowest retained score, if any.
    pub fn floor(&self) -> Option<u64> {
        self.entries.last().map(|c| c.score)
    }

    /// Offers a candidate. Returns true if it was retained.
    ///
    /// Once full, a score at or below the floor is rejected and the set is
    /// left untouched; otherwise the floor entry is evicted. An accepted
    /// candidate with a score equal to an existing entry ranks after it.
    pub fn insert(&mut self, nonce: &[u8], score: u64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.entries.len() == self.capacity {
            match self.floor() {
                Some(floor) if score <= floor => return false,
                _ => {
                    self.entries.pop();
                }
            }
        }
        let at = self.entries.partition_point(|c| c.score >= score);
        self.entries.insert(
            at,
            Candidate {
                nonce: nonce.to_vec(),
                score,
            },
        );
        true
    }

    /// The retained candidates, highest score first.
    pub fn entries(&self) -> &[Candidate] {
        &self.entries
    }

    /// Consumes the set, yielding its candidates highest score first.
    pub fn into_entries(self) -> Vec<Candidate> {
        self.entries
    }

    /// Merges rankings into a single top-`capacity` set.
    ///
    /// Deterministic, and lossy: only entries the inputs retained
    /// participate. Nonce lanes are disjoint across workers, so no
    /// deduplication is needed. A stable sort keeps earlier inputs ahead
    /// on score ties.
    pub fn merge<I>(capacity: usize, sets: I) -> RankingSet
    where
        I: IntoIterator<Item = RankingSet>,
    {
        let mut all: Vec<Candidate> = sets
            .into_iter()
            .flat_map(RankingSet::into_entries)
            .collect();
        all.sort_by(|a, b| b.score.cmp(&a.score));
        all.truncate(capacity);
        RankingSet {
            capacity,
            entries: all,
        }
    }
}

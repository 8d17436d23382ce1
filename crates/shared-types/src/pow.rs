//! # Proof-of-Work Score
//!
//! The score of a (target, nonce) pair. The hash primitive is double
//! SHA-256; the score is the big-endian value of the first eight digest
//! bytes. There is no difficulty bar. Higher scores simply rank higher,
//! and the per-block competition sets the effective floor.

use sha2::{Digest, Sha256};

/// Scores a nonce against a mining target.
///
/// Deterministic and stateless: every node computes the same score for the
/// same inputs, which the grading layer depends on.
pub fn pow_score(target: &[u8], nonce: &[u8]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(target);
    hasher.update(nonce);
    let first = hasher.finalize();
    let second = Sha256::digest(first);
    u64::from_be_bytes(second[..8].try_into().expect("digest is 32 bytes"))
}

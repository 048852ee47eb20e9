//! Deterministic train/test assignment.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{PuzzleError, PuzzleResult};

/// Resolution of the split ratio (basis points).
const SPLIT_BUCKETS: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable 64-bit fingerprint of a puzzle id (first 8 bytes of SHA-256).
pub fn fingerprint_id(id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    let d = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&d[..8]);
    u64::from_le_bytes(head)
}

/// Assigns ids to train or test from their fingerprint, so a given id lands in
/// the same split on every run.
#[derive(Clone, Copy, Debug)]
pub struct Splitter {
    train_cutoff: u64,
}

impl Splitter {
    /// `train_ratio` is the share of ids sent to train, in `[0, 1]`.
    pub fn new(train_ratio: f64) -> PuzzleResult<Self> {
        if !(0.0..=1.0).contains(&train_ratio) {
            return Err(PuzzleError::Config(format!(
                "train ratio must be within [0, 1], got {train_ratio}"
            )));
        }
        let train_cutoff = (train_ratio * SPLIT_BUCKETS as f64).round() as u64;
        Ok(Self { train_cutoff })
    }

    pub fn assign(&self, id: &str) -> Split {
        if fingerprint_id(id) % SPLIT_BUCKETS < self.train_cutoff {
            Split::Train
        } else {
            Split::Test
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_stable() {
        let s = Splitter::new(0.8).unwrap();
        for id in ["abc123", "00sHx", "zzzzz", ""] {
            assert_eq!(s.assign(id), s.assign(id));
            assert_eq!(s.assign(id), Splitter::new(0.8).unwrap().assign(id));
        }
    }

    #[test]
    fn fingerprint_is_fixed_across_builds() {
        // SHA-256("abc") starts with ba 78 16 bf 8f 01 cf ea
        assert_eq!(fingerprint_id("abc"), u64::from_le_bytes([0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea]));
    }

    #[test]
    fn extreme_ratios() {
        let all_train = Splitter::new(1.0).unwrap();
        let all_test = Splitter::new(0.0).unwrap();
        for i in 0..200 {
            let id = format!("p{i}");
            assert_eq!(all_train.assign(&id), Split::Train);
            assert_eq!(all_test.assign(&id), Split::Test);
        }
    }

    #[test]
    fn ratio_is_roughly_respected() {
        let s = Splitter::new(0.8).unwrap();
        let train = (0..10_000).filter(|i| s.assign(&format!("id{i}")) == Split::Train).count();
        assert!((7_500..8_500).contains(&train), "train count {train}");
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        assert!(Splitter::new(1.5).is_err());
        assert!(Splitter::new(-0.1).is_err());
        assert!(Splitter::new(f64::NAN).is_err());
    }
}

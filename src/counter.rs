//! Commutative 8-byte counters used for queue telemetry.
//!
//! A counter value is an unsigned 64-bit integer stored big-endian. Updates
//! are expressed as operands folded into the stored base with [`full_merge`];
//! two pending operands can be pre-combined with [`partial_merge`]. Both are
//! plain sums, so any grouping or ordering of operands yields the same value.

use crate::key;
use crate::{Error, Result};

pub const COUNTER_LEN: usize = 8;

/// The reserved meta-counters kept in every queue namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Number of successful dequeues.
    Head,
    /// Highest id ever committed.
    Tail,
}

impl Counter {
    pub fn name(self) -> &'static str {
        match self {
            Counter::Head => "head",
            Counter::Tail => "tail",
        }
    }

    pub fn key(self) -> Vec<u8> {
        key::meta_key(self.name())
    }

    pub fn decode(self, bytes: &[u8]) -> Result<u64> {
        decode(bytes).ok_or(Error::CorruptCounter {
            counter: self.name(),
            len: bytes.len(),
        })
    }
}

pub fn encode(value: u64) -> [u8; COUNTER_LEN] {
    value.to_be_bytes()
}

pub fn decode(bytes: &[u8]) -> Option<u64> {
    let bytes: [u8; COUNTER_LEN] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Folds pending operands into the stored base. A missing base counts as zero.
pub fn full_merge(existing: Option<u64>, operands: &[u64]) -> u64 {
    operands
        .iter()
        .fold(existing.unwrap_or(0), |acc, &operand| acc.saturating_add(operand))
}

/// Pre-combines two pending operands before they reach a base value.
pub fn partial_merge(left: u64, right: u64) -> u64 {
    left.saturating_add(right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_merge_without_operands_is_identity() {
        assert_eq!(full_merge(Some(17), &[]), 17);
        assert_eq!(full_merge(None, &[]), 0);
    }

    #[test]
    fn merge_is_associative_and_commutative() {
        let (a, b, c) = (3u64, 11u64, 1u64);
        let left = full_merge(Some(a), &[partial_merge(b, c)]);
        let right = full_merge(Some(full_merge(Some(a), &[b])), &[c]);
        assert_eq!(left, right);
        assert_eq!(full_merge(Some(a), &[b, c]), full_merge(Some(a), &[c, b]));
        assert_eq!(partial_merge(partial_merge(a, b), c), partial_merge(a, partial_merge(b, c)));
    }

    #[test]
    fn increments_accumulate() {
        let ones = vec![1u64; 64];
        assert_eq!(full_merge(None, &ones), 64);
        let pre = ones.iter().copied().reduce(partial_merge).unwrap();
        assert_eq!(full_merge(Some(10), &[pre]), 74);
    }

    #[test]
    fn merge_saturates_instead_of_wrapping() {
        assert_eq!(full_merge(Some(u64::MAX), &[1]), u64::MAX);
    }

    #[test]
    fn decode_rejects_malformed_bytes() {
        assert_eq!(decode(&encode(0x0102_0304_0506_0708)), Some(0x0102_0304_0506_0708));
        let err = Counter::Tail.decode(b"oops").unwrap_err();
        assert!(matches!(err, Error::CorruptCounter { counter: "tail", len: 4 }));
    }

    #[test]
    fn counter_keys_are_distinct_meta_keys() {
        assert_ne!(Counter::Head.key(), Counter::Tail.key());
        assert!(Counter::Head.key().len() > key::ID_LEN);
    }
}

//! Pick Codec
//!
//! A pick is a strictly ascending list of distinct ball values in
//! `[1, max_ball_value]`. Its canonical identity is a 256-bit set where
//! bit `v` is set iff ball `v` was picked. Bit 0 is never set.

use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of 64-bit limbs backing a [`PickSet`].
const LIMBS: usize = 4;

/// Canonical identity of a pick: one bit per ball value.
///
/// Ordering is by limb, which gives BTreeMap keys a stable order; it carries
/// no meaning beyond that.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PickSet([u64; LIMBS]);

impl PickSet {
    /// The empty set (no ball picked).
    pub const EMPTY: PickSet = PickSet([0; LIMBS]);

    #[inline]
    fn insert(&mut self, value: u8) {
        self.0[(value >> 6) as usize] |= 1u64 << (value & 63);
    }

    /// Check whether a ball value is part of this pick.
    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        self.0[(value >> 6) as usize] & (1u64 << (value & 63)) != 0
    }

    /// Number of balls in the set.
    pub fn len(&self) -> usize {
        self.0.iter().map(|limb| limb.count_ones() as usize).sum()
    }

    /// Check whether no ball is set.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|limb| *limb == 0)
    }

    /// Ball values in ascending order.
    pub fn values(&self) -> Vec<u8> {
        (1..=u8::MAX).filter(|v| self.contains(*v)).collect()
    }

    /// Big-endian 32-byte form, used for hashing and display.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().rev().enumerate() {
            out[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_be_bytes());
        }
        out
    }
}

impl fmt::Display for PickSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.values().iter().map(|v| v.to_string()).collect();
        write!(f, "[{}]", values.join(", "))
    }
}

/// Pick validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    /// Pick does not contain exactly the configured number of balls.
    #[error("invalid pick length: expected {expected}, got {got}")]
    InvalidPickLength {
        /// Configured number of picks.
        expected: u8,
        /// Number supplied.
        got: usize,
    },

    /// A ball is zero, repeated, or out of ascending order.
    #[error("unsorted or invalid pick: {value} does not follow {previous}")]
    UnsortedOrInvalidPick {
        /// Offending value.
        value: u8,
        /// Value it had to exceed.
        previous: u8,
    },

    /// A ball exceeds the configured maximum.
    #[error("ball {value} out of range (max {max})")]
    BallOutOfRange {
        /// Offending value.
        value: u8,
        /// Configured maximum ball value.
        max: u8,
    },
}

/// Encode a pick into its canonical set.
///
/// A single "strictly greater than the previous value" check rejects zero,
/// duplicates and descending order at once, since the previous value starts at 0.
pub fn encode(picks: &[u8], num_picks: u8, max_ball_value: u8) -> Result<PickSet, PickError> {
    if picks.len() != num_picks as usize {
        return Err(PickError::InvalidPickLength {
            expected: num_picks,
            got: picks.len(),
        });
    }

    let mut set = PickSet::EMPTY;
    let mut previous = 0u8;
    for &value in picks {
        if value <= previous {
            return Err(PickError::UnsortedOrInvalidPick { value, previous });
        }
        if value > max_ball_value {
            return Err(PickError::BallOutOfRange {
                value,
                max: max_ball_value,
            });
        }
        set.insert(value);
        previous = value;
    }
    Ok(set)
}

/// Decode a set back into its ordered pick.
///
/// Emits at most `num_picks` values, low to high. Sets built by [`encode`] or by
/// the draw always hold exactly that many.
pub fn decode(pick: PickSet, num_picks: u8) -> Vec<u8> {
    let values: Vec<u8> = pick.values().into_iter().take(num_picks as usize).collect();
    debug_assert_eq!(values.len(), num_picks as usize, "malformed pick identity");
    values
}

/// Build a set from already-distinct values without range checks.
///
/// Only for values produced by the draw, which are distinct and in range by
/// construction.
pub(crate) fn from_distinct(values: &[u8]) -> PickSet {
    let mut set = PickSet::EMPTY;
    for &value in values {
        set.insert(value);
    }
    set
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_sets_one_bit_per_ball() {
        let set = encode(&[1, 2, 3, 4, 5], 5, 36).unwrap();
        assert_eq!(set.len(), 5);
        for v in 1..=5 {
            assert!(set.contains(v));
        }
        assert!(!set.contains(0));
        assert!(!set.contains(6));
    }

    #[test]
    fn test_encode_high_values() {
        let set = encode(&[63, 64, 127, 128, 255], 5, 255).unwrap();
        assert_eq!(set.values(), vec![63, 64, 127, 128, 255]);
    }

    #[test]
    fn test_invalid_length() {
        assert_eq!(
            encode(&[1, 2, 3], 5, 36),
            Err(PickError::InvalidPickLength { expected: 5, got: 3 })
        );
        assert!(matches!(
            encode(&[1, 2, 3, 4, 5, 6], 5, 36),
            Err(PickError::InvalidPickLength { .. })
        ));
    }

    #[test]
    fn test_single_check_rejects_zero_duplicates_and_descending() {
        assert!(matches!(
            encode(&[0, 2, 3, 4, 5], 5, 36),
            Err(PickError::UnsortedOrInvalidPick { value: 0, previous: 0 })
        ));
        assert!(matches!(
            encode(&[1, 2, 2, 4, 5], 5, 36),
            Err(PickError::UnsortedOrInvalidPick { value: 2, previous: 2 })
        ));
        assert!(matches!(
            encode(&[5, 4, 3, 2, 1], 5, 36),
            Err(PickError::UnsortedOrInvalidPick { value: 4, previous: 5 })
        ));
    }

    #[test]
    fn test_ball_out_of_range() {
        assert_eq!(
            encode(&[5, 10, 41, 46, 55], 5, 36),
            Err(PickError::BallOutOfRange { value: 41, max: 36 })
        );
        assert!(encode(&[32, 33, 34, 35, 36], 5, 36).is_ok());
    }

    #[test]
    fn test_display() {
        let set = encode(&[3, 7, 11], 3, 20).unwrap();
        assert_eq!(set.to_string(), "[3, 7, 11]");
        assert_eq!(PickSet::EMPTY.to_string(), "[]");
    }

    #[test]
    fn test_to_bytes_is_big_endian() {
        let set = encode(&[1], 1, 10).unwrap();
        let bytes = set.to_bytes();
        assert_eq!(bytes[31], 0b10);
        assert!(bytes[..31].iter().all(|b| *b == 0));

        let set = encode(&[255], 1, 255).unwrap();
        assert_eq!(set.to_bytes()[0], 0x80);
    }

    fn arb_pick() -> impl Strategy<Value = (Vec<u8>, u8)> {
        (1u8..=255)
            .prop_flat_map(|max| {
                (prop::collection::btree_set(1u8..=max, 1..=(max as usize).min(12)), Just(max))
            })
            .prop_map(|(set, max)| (set.into_iter().collect(), max))
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode((picks, max) in arb_pick()) {
            let n = picks.len() as u8;
            let set = encode(&picks, n, max).unwrap();
            prop_assert_eq!(set.len(), picks.len());
            prop_assert_eq!(decode(set, n), picks);
        }

        #[test]
        fn prop_equal_picks_equal_identity((picks, max) in arb_pick()) {
            let n = picks.len() as u8;
            prop_assert_eq!(encode(&picks, n, max).unwrap(), from_distinct(&picks));
        }
    }
}

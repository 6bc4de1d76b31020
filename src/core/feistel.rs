//! Winning Pick Derivation
//!
//! Derives the winning balls from a random seed with a keyed, format-preserving
//! permutation over `[0, max_ball_value)`: selection index `i` is encrypted with
//! a balanced Feistel network (cycle-walking back into the domain), and the
//! ciphertext plus one is ball `i`. Distinct indices give distinct balls.
//!
//! Same seed + same parameters = same pick, on every platform. Winning picks
//! published for a round can be re-derived by anyone holding the seed.

use crate::core::hash::{digest_mod, StateHasher};
use crate::core::pick::{self, PickSet};

/// Random seed delivered by the randomness source (one 256-bit word).
pub type Seed = [u8; 32];

/// Number of Feistel rounds per encryption.
pub const FEISTEL_ROUNDS: u32 = 12;

/// Build a seed from a small integer, big-endian in the low bytes.
///
/// Matches the 256-bit word a randomness source would deliver for that value.
pub fn seed_from_u64(value: u64) -> Seed {
    let mut seed = [0u8; 32];
    seed[24..].copy_from_slice(&value.to_be_bytes());
    seed
}

/// Smallest `h` with `h * h >= n`.
fn ceil_sqrt(n: u64) -> u64 {
    let mut h = (n as f64).sqrt() as u64;
    while h * h < n {
        h += 1;
    }
    while h > 0 && (h - 1) * (h - 1) >= n {
        h -= 1;
    }
    h
}

/// Feistel round function: hash of (half, round, seed, domain), reduced mod `h`.
#[inline]
fn round_fn(half: u64, round: u32, seed: &Seed, domain: u64, h: u64) -> u64 {
    let mut hasher = StateHasher::for_feistel_round();
    hasher.update_u64(half);
    hasher.update_u32(round);
    hasher.update_bytes(seed);
    hasher.update_u64(domain);
    digest_mod(&hasher.finalize(), h)
}

/// Permute `x` within `[0, domain)` under `seed`.
///
/// The network runs over `[0, h²)` with `h = ceil(sqrt(domain))`; outputs that
/// land outside the domain are re-encrypted until they fall inside.
pub fn shuffle(x: u64, domain: u64, seed: &Seed, rounds: u32) -> u64 {
    debug_assert!(x < domain, "index {} outside domain {}", x, domain);
    if domain <= 1 {
        return 0;
    }

    let h = ceil_sqrt(domain);
    let mut x = x;
    loop {
        let mut left = x % h;
        let mut right = x / h;
        for round in 0..rounds {
            let next_right = (left + round_fn(right, round, seed, domain, h)) % h;
            left = right;
            right = next_right;
        }
        x = h * right + left;
        if x < domain {
            return x;
        }
    }
}

/// Derive the ascending winning balls for a seed.
///
/// `num_picks <= max_ball_value` is the caller's responsibility; configuration
/// validation enforces it before any draw can happen.
pub fn winning_balls(seed: &Seed, num_picks: u8, max_ball_value: u8) -> Vec<u8> {
    let domain = max_ball_value as u64;
    let mut balls: Vec<u8> = (0..num_picks as u64)
        .map(|i| (shuffle(i, domain, seed, FEISTEL_ROUNDS) + 1) as u8)
        .collect();
    balls.sort_unstable();

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(seed = %hex::encode(seed), ?balls, "derived winning balls");

    balls
}

/// Derive the winning pick identity for a seed.
pub fn compute_winning_pick(seed: &Seed, num_picks: u8, max_ball_value: u8) -> PickSet {
    pick::from_distinct(&winning_balls(seed, num_picks, max_ball_value))
}

// =============================================================================
// TESTS
// =============================================================================

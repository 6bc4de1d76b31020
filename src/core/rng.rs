//! Deterministic Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. The in-memory randomness source
//! answers each request from a stream keyed by its secret and the request
//! id, so simulated fulfilments replay exactly.

use super::feistel::Seed;
use super::hash::StateHasher;

/// Xorshift128+ stream.
///
/// ```
/// use lotto::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::for_request(&[7; 32], 1);
/// let mut b = DeterministicRng::for_request(&[7; 32], 1);
/// assert_eq!(a.next_word(), b.next_word());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterministicRng {
    s0: u64,
    s1: u64,
}

impl DeterministicRng {
    /// Stream from a 64-bit seed. SplitMix64 spreads weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let s0 = splitmix64(&mut sm);
        let s1 = splitmix64(&mut sm);
        // The all-zero state is a fixed point.
        if s0 | s1 == 0 {
            return Self { s0: 1, s1: 1 };
        }
        Self { s0, s1 }
    }

    /// Stream answering one randomness request.
    pub fn for_request(secret: &[u8; 32], request_id: u64) -> Self {
        Self::new(derive_request_seed(secret, request_id))
    }

    /// Next 64 bits.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let (a, mut b) = (self.s0, self.s1);
        let out = a.wrapping_add(b);
        b ^= a;
        self.s0 = a.rotate_left(24) ^ b ^ (b << 16);
        self.s1 = b.rotate_left(37);
        out
    }

    /// Value in `[0, bound)`; 0 when `bound` is 0.
    #[inline]
    pub fn below(&mut self, bound: u64) -> u64 {
        match bound {
            0 => 0,
            n => self.next_u64() % n,
        }
    }

    /// One 256-bit random word, big-endian limbs.
    pub fn next_word(&mut self) -> Seed {
        let mut word = [0u8; 32];
        for limb in word.chunks_exact_mut(8) {
            limb.copy_from_slice(&self.next_u64().to_be_bytes());
        }
        word
    }

    /// `count` random words.
    pub fn words(&mut self, count: usize) -> Vec<Seed> {
        std::iter::repeat_with(|| self.next_word()).take(count).collect()
    }

    /// Random valid pick: `num_picks` distinct balls from `1..=max_ball_value`,
    /// ascending.
    pub fn quick_pick(&mut self, num_picks: u8, max_ball_value: u8) -> Vec<u8> {
        let mut balls: Vec<u8> = (1..=max_ball_value).collect();
        // Partial Fisher-Yates: only the first `num_picks` slots are needed.
        let take = (num_picks as usize).min(balls.len());
        for i in 0..take {
            let j = i + self.below((balls.len() - i) as u64) as usize;
            balls.swap(i, j);
        }
        balls.truncate(take);
        balls.sort_unstable();
        balls
    }
}

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of the stream for one request: the source secret bound to the id.
pub fn derive_request_seed(secret: &[u8; 32], request_id: u64) -> u64 {
    let mut hasher = StateHasher::new(b"LOTTO_RANDOMNESS_V1");
    hasher.update_bytes(secret);
    hasher.update_u64(request_id);
    let digest = hasher.finalize();
    u64::from_le_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

// =============================================================================
// TESTS
// =============================================================================

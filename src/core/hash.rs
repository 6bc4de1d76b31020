//! Domain-separated SHA-256.
//!
//! Every digest in the engine starts with a version-tagged domain string:
//! Feistel round keys, configuration hashes and lottery state hashes all
//! go through [`StateHasher`]. Integers are fed little-endian, variable
//! length data is length-prefixed, so the byte stream is unambiguous.

use sha2::{Digest, Sha256};

/// 32-byte digest.
pub type StateHash = [u8; 32];

const STATE_DOMAIN: &[u8] = b"LOTTO_STATE_V1";
const CONFIG_DOMAIN: &[u8] = b"LOTTO_CONFIG_V1";
const FEISTEL_DOMAIN: &[u8] = b"LOTTO_FEISTEL_V1";

/// Incremental hasher. Callers must feed fields in a fixed order.
pub struct StateHasher {
    inner: Sha256,
}

macro_rules! update_le {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Feed a `", stringify!($ty), "` (little-endian).")]
            #[inline]
            pub fn $name(&mut self, value: $ty) {
                self.inner.update(value.to_le_bytes());
            }
        )*
    };
}

impl StateHasher {
    /// Hasher whose stream begins with `domain`.
    pub fn new(domain: &[u8]) -> Self {
        Self { inner: Sha256::new_with_prefix(domain) }
    }

    /// Lottery state hashes.
    pub fn for_lottery_state() -> Self {
        Self::new(STATE_DOMAIN)
    }

    /// Configuration hashes.
    pub fn for_config() -> Self {
        Self::new(CONFIG_DOMAIN)
    }

    /// Feistel round function.
    pub fn for_feistel_round() -> Self {
        Self::new(FEISTEL_DOMAIN)
    }

    /// Feed raw bytes, no length prefix.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Feed a string behind its u64 byte length.
    pub fn update_str(&mut self, value: &str) {
        self.update_u64(value.len() as u64);
        self.update_bytes(value.as_bytes());
    }

    update_le! {
        update_u8: u8,
        update_u16: u16,
        update_u32: u32,
        update_u64: u64,
        update_u128: u128,
    }

    /// Feed a flag as one byte.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(u8::from(value));
    }

    /// Feed an optional 32-byte value: a presence flag, then the bytes.
    pub fn update_opt_bytes32(&mut self, value: Option<&[u8; 32]>) {
        self.update_bool(value.is_some());
        if let Some(bytes) = value {
            self.update_bytes(bytes);
        }
    }

    /// Consume the hasher.
    pub fn finalize(self) -> StateHash {
        self.inner.finalize().into()
    }
}

/// One-shot `SHA-256(domain || data)`.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> StateHash {
    let mut hasher = StateHasher::new(domain);
    hasher.update_bytes(data);
    hasher.finalize()
}

/// Big-endian digest reduced mod `modulus`; 0 for a zero modulus.
pub fn digest_mod(digest: &StateHash, modulus: u64) -> u64 {
    if modulus == 0 {
        return 0;
    }
    let m = u128::from(modulus);
    let rem = digest
        .iter()
        .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % m);
    rem as u64
}

// =============================================================================
// TESTS
// =============================================================================

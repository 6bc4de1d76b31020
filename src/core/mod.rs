//! Core deterministic primitives.
//!
//! Pick encoding, winning-pick derivation and hashing are pure functions of
//! their inputs. `journal` holds the undoable map the lottery state uses.

pub mod pick;
pub mod feistel;
pub mod rng;
pub mod hash;
pub mod journal;

// Re-export core types
pub use pick::{PickSet, PickError};
pub use feistel::{Seed, compute_winning_pick, seed_from_u64, winning_balls};
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher};
pub use journal::JournaledMap;

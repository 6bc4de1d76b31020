//! # Lotto Engine
//!
//! Recurring number lottery with verifiable draws and conserved jackpot
//! accounting.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        LOTTO ENGINE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── pick.rs     - Pick set encoding                         │
//! │  ├── feistel.rs  - Keyed permutation and winning pick        │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - Domain-separated SHA-256 hashing          │
//! │                                                              │
//! │  game/           - Lottery logic (deterministic)             │
//! │  ├── state.rs    - Rounds, tickets, identities               │
//! │  ├── config.rs   - Parameters and validation                 │
//! │  ├── fees.rs     - Revenue split                             │
//! │  ├── ledger.rs   - Jackpot and payout pools                  │
//! │  ├── lottery.rs  - Instance and read accessors               │
//! │  ├── purchase.rs - Tickets and jackpot seeding               │
//! │  ├── draw.rs     - Draw and round advancement                │
//! │  ├── claim.rs    - Settlement                                │
//! │  └── admin.rs    - Termination, fees, rescues                │
//! │                                                              │
//! │  external/       - Collaborator traits + in-memory versions  │
//! │  service/        - Multi-instance manager (async)            │
//! │  proof/          - Round transcripts and verification        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules never read a clock or an entropy source:
//! - Time arrives in each call's [`CallContext`]
//! - Randomness arrives through the randomness callback
//! - No HashMap (uses BTreeMap for sorted iteration)
//!
//! Given the same calls, two instances reach the same
//! [`state_hash`](Lottery::state_hash), and a transcript of their rounds
//! verifies anywhere.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod external;
pub mod service;
pub mod proof;

// Re-export commonly used types
pub use core::pick::{PickSet, PickError};
pub use core::feistel::{Seed, compute_winning_pick};
pub use core::rng::DeterministicRng;
pub use game::{
    Address, Amount, CallContext, ClaimOutcome, DrawOutcome, GameId, GameState, InMemoryLottery,
    Lottery, LotteryConfig, LotteryError, LotteryEvent, Ticket, TokenId,
};
pub use proof::{verify_transcript, LotteryTranscript};
pub use service::{LotteryManager, LotteryRequest, LotteryResponse};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Lottery State Definitions
//!
//! Identities, rounds, tickets and the current-game pointer.
//! Uses BTreeMap-friendly ordered keys throughout for deterministic iteration.

use std::fmt;

use serde::{Serialize, Deserialize, Serializer, Deserializer};
use serde::de::Error as _;
use sha2::{Sha256, Digest};

use crate::core::feistel::Seed;
use crate::core::hash::StateHasher;
use crate::core::pick::PickSet;
use crate::game::ledger::Rollover;

/// Monetary amount in the prize asset's smallest unit.
pub type Amount = u128;

/// Round identifier (monotonic, starts at 0).
pub type GameId = u64;

/// Ticket identifier (sequential, starts at 1).
pub type TokenId = u64;

/// Randomness request identifier assigned by the source.
pub type RequestId = u64;

// =============================================================================
// ADDRESS
// =============================================================================

/// Account identifier (20 bytes).
///
/// Implements Ord for deterministic BTreeMap ordering. Serialized as a
/// `0x`-prefixed hex string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0; 20]);

    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic address from a label.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"lotto-address:");
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[..20]);
        Self(bytes)
    }

    /// Parse from hex, with or without `0x`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()?;
        let bytes: [u8; 20] = raw.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Check for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 20]
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Short form for logs (first four bytes).
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid address: {}", s)))
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Lifecycle state of the lottery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GameState {
    /// Created but not yet configured.
    #[default]
    Uninitialised = 0,
    /// Tickets on sale for the current round.
    Purchase = 1,
    /// Waiting for the randomness source to answer.
    DrawPending = 2,
    /// Closed for good; only claims remain.
    Dead = 3,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameState::Uninitialised => "Uninitialised",
            GameState::Purchase => "Purchase",
            GameState::DrawPending => "DrawPending",
            GameState::Dead => "Dead",
        };
        f.write_str(name)
    }
}

/// Pointer to the active round. The only record of "which round are we in".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentGame {
    /// Lifecycle state.
    pub state: GameState,
    /// Active round id.
    pub id: GameId,
}

// =============================================================================
// ROUND
// =============================================================================

/// Data of one round ("game").
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Tickets recorded against this round.
    pub tickets_sold: u64,

    /// Timestamp the round opened.
    pub started_at: u64,

    /// Winning pick, set when randomness is fulfilled.
    pub winning_pick: Option<PickSet>,

    /// Seed the winning pick was derived from.
    pub winning_seed: Option<Seed>,

    /// Winning tickets already paid.
    pub claimed_winners: u64,

    /// Consolation shares already paid (terminal no-winner round only).
    pub claimed_consolations: u64,

    /// Pool reallocation applied when this round ended.
    pub rollover: Option<Rollover>,
}

impl Round {
    /// Open a new round.
    pub fn new(started_at: u64) -> Self {
        Self {
            started_at,
            ..Default::default()
        }
    }

    /// Check if the round has been drawn.
    pub fn is_drawn(&self) -> bool {
        self.winning_pick.is_some()
    }

    /// Hash this round for state verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.tickets_sold);
        hasher.update_u64(self.started_at);
        let pick = self.winning_pick.map(|p| p.to_bytes());
        hasher.update_opt_bytes32(pick.as_ref());
        hasher.update_opt_bytes32(self.winning_seed.as_ref());
        hasher.update_u64(self.claimed_winners);
        hasher.update_u64(self.claimed_consolations);
        if let Some(rollover) = &self.rollover {
            rollover.hash_into(hasher);
        }
    }
}

// =============================================================================
// TICKETS
// =============================================================================

/// Ticket request: who receives it and which balls they picked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Recipient of the minted ticket.
    pub owner: Address,
    /// Picked balls, strictly ascending.
    pub picks: Vec<u8>,
}

impl Ticket {
    /// Create a ticket request.
    pub fn new(owner: Address, picks: Vec<u8>) -> Self {
        Self { owner, picks }
    }
}

/// What the lottery remembers about a minted ticket.
///
/// Kept after the ticket burns; ownership lives in the ticket ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Round the ticket was bought in.
    pub game_id: GameId,
    /// Pick identity.
    pub pick: PickSet,
}

/// Outstanding randomness request. Present only while a draw is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    /// Source-assigned id.
    pub request_id: RequestId,
    /// When it was issued.
    pub requested_at: u64,
}

// =============================================================================
// TESTS
// =============================================================================

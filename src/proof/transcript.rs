//! Round Transcript
//!
//! Everything needed to re-check a lottery's finished rounds: the
//! configuration, each round's seed and winning pick, its winner count and
//! the pool reallocation applied when it ended. Compact bincode encoding.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::feistel::Seed;
use crate::core::hash::StateHash;
use crate::core::pick::PickSet;
use crate::external::{RandomnessSource, TicketLedger, ValueAsset};
use crate::game::config::LotteryConfig;
use crate::game::ledger::Rollover;
use crate::game::lottery::Lottery;
use crate::game::state::{Address, GameId, GameState};

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Transcript failures.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Encoding failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Bytes are not a transcript.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),
}

/// One finished round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round id.
    pub game_id: GameId,

    /// Tickets sold in the round.
    pub tickets_sold: u64,

    /// When the round opened.
    pub started_at: u64,

    /// Seed delivered by the randomness source (None if skipped).
    pub winning_seed: Option<Seed>,

    /// Winning pick derived from the seed.
    pub winning_pick: Option<PickSet>,

    /// Tickets that matched.
    pub num_winners: u64,

    /// Pool reallocation at the end of the round.
    pub rollover: Rollover,
}

/// Finished rounds of one lottery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryTranscript {
    /// Version for forward compatibility.
    pub version: u8,

    /// Lottery account.
    pub lottery: Address,

    /// Parameters the rounds ran under.
    pub config: LotteryConfig,

    /// Hash of `config` at export time.
    pub config_hash: StateHash,

    /// Finished rounds, ascending by id.
    pub rounds: Vec<RoundRecord>,

    /// Whether the lottery had died when exported.
    pub is_dead: bool,

    /// Full state hash at export time.
    pub state_hash: StateHash,
}

impl LotteryTranscript {
    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TranscriptError> {
        bincode::serialize(self).map_err(|e| TranscriptError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TranscriptError> {
        bincode::deserialize(data).map_err(|e| TranscriptError::DeserializationFailed(e.to_string()))
    }

    /// Number of rounds that were drawn (not skipped).
    pub fn drawn_rounds(&self) -> usize {
        self.rounds.iter().filter(|r| r.winning_pick.is_some()).count()
    }
}

impl<L, R, A> Lottery<L, R, A>
where
    L: TicketLedger,
    R: RandomnessSource,
    A: ValueAsset,
{
    /// Export the finished rounds.
    pub fn transcript(&self) -> LotteryTranscript {
        let rounds = self
            .rounds()
            .filter_map(|(id, round)| {
                round.rollover.map(|rollover| RoundRecord {
                    game_id: *id,
                    tickets_sold: round.tickets_sold,
                    started_at: round.started_at,
                    winning_seed: round.winning_seed,
                    winning_pick: round.winning_pick,
                    num_winners: self.num_winners(*id),
                    rollover,
                })
            })
            .collect();

        LotteryTranscript {
            version: TRANSCRIPT_VERSION,
            lottery: self.address(),
            config: self.config().clone(),
            config_hash: self.config().config_hash(),
            rounds,
            is_dead: self.current_game().state == GameState::Dead,
            state_hash: self.state_hash(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

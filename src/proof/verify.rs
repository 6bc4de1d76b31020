//! Transcript Verification
//!
//! Re-checks a transcript without trusting the lottery that produced it:
//! every winning pick is re-derived from its seed, every rollover is checked
//! against the rollover table, and consecutive rounds must chain.

use thiserror::Error;

use crate::core::feistel::compute_winning_pick;
use crate::core::pick::PickSet;
use crate::game::state::GameId;
use crate::proof::transcript::{LotteryTranscript, TRANSCRIPT_VERSION};

/// Verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Transcript written by another format version.
    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Version this build reads.
        expected: u8,
        /// Version found.
        got: u8,
    },

    /// Recorded config hash does not match the config.
    #[error("config hash does not match config")]
    ConfigHashMismatch,

    /// Round ids are not 0, 1, 2, ...
    #[error("round {got} out of sequence, expected {expected}")]
    RoundOutOfSequence {
        /// Next id in sequence.
        expected: GameId,
        /// Id found.
        got: GameId,
    },

    /// Recorded pick does not follow from the seed.
    #[error("round {game_id}: winning pick {recorded} does not follow from its seed ({derived})")]
    WinningPickMismatch {
        /// Round.
        game_id: GameId,
        /// Pick in the transcript.
        recorded: PickSet,
        /// Pick the seed produces.
        derived: PickSet,
    },

    /// Seed without pick or pick without seed.
    #[error("round {0}: seed and winning pick must be both present or both absent")]
    IncompleteDraw(GameId),

    /// Tickets sold but never drawn.
    #[error("round {0}: tickets were sold but no draw happened")]
    MissingDraw(GameId),

    /// More winners than tickets.
    #[error("round {0}: more winners than tickets")]
    WinnerBoundExceeded(GameId),

    /// Rollover breaks conservation or the table.
    #[error("round {0}: rollover does not conserve or follow the rollover table")]
    InvalidRollover(GameId),

    /// Pools differ between consecutive rounds.
    #[error("round {0}: pools changed between rounds in a way no operation allows")]
    BrokenChain(GameId),

    /// Rounds recorded after the terminal one.
    #[error("round {0}: terminal round is not the last one")]
    TerminalNotLast(GameId),
}

/// Summary of a successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationSummary {
    /// Rounds checked.
    pub rounds_checked: usize,
    /// Rounds whose pick was re-derived.
    pub draws_verified: usize,
}

/// Verify a transcript end to end.
pub fn verify_transcript(transcript: &LotteryTranscript) -> Result<VerificationSummary, VerificationError> {
    if transcript.version != TRANSCRIPT_VERSION {
        return Err(VerificationError::VersionMismatch {
            expected: TRANSCRIPT_VERSION,
            got: transcript.version,
        });
    }
    if transcript.config.config_hash() != transcript.config_hash {
        return Err(VerificationError::ConfigHashMismatch);
    }

    let num_picks = transcript.config.num_picks;
    let max_ball_value = transcript.config.max_ball_value;
    let mut draws_verified = 0;

    for (index, record) in transcript.rounds.iter().enumerate() {
        let game_id = record.game_id;
        if game_id != index as GameId {
            return Err(VerificationError::RoundOutOfSequence {
                expected: index as GameId,
                got: game_id,
            });
        }

        match (record.winning_seed, record.winning_pick) {
            (Some(seed), Some(recorded)) => {
                let derived = compute_winning_pick(&seed, num_picks, max_ball_value);
                if derived != recorded {
                    return Err(VerificationError::WinningPickMismatch {
                        game_id,
                        recorded,
                        derived,
                    });
                }
                draws_verified += 1;
            }
            (None, None) => {
                if record.tickets_sold > 0 {
                    return Err(VerificationError::MissingDraw(game_id));
                }
            }
            _ => return Err(VerificationError::IncompleteDraw(game_id)),
        }

        if record.num_winners > record.tickets_sold {
            return Err(VerificationError::WinnerBoundExceeded(game_id));
        }

        let rollover = &record.rollover;
        if !rollover.is_consistent() || rollover.had_winner != (record.num_winners > 0) {
            return Err(VerificationError::InvalidRollover(game_id));
        }

        let is_last = index + 1 == transcript.rounds.len();
        if rollover.is_terminal && !is_last {
            return Err(VerificationError::TerminalNotLast(game_id));
        }

        // Between rounds the jackpot only grows (purchases, seeding) and
        // unclaimed payouts only shrink (claims).
        if let Some(prev) = index.checked_sub(1).map(|i| &transcript.rounds[i].rollover) {
            if rollover.jackpot_before < prev.jackpot_after
                || rollover.unclaimed_before > prev.unclaimed_after
            {
                return Err(VerificationError::BrokenChain(game_id));
            }
        }
    }

    Ok(VerificationSummary {
        rounds_checked: transcript.rounds.len(),
        draws_verified,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feistel::seed_from_u64;
    use crate::game::fixtures::Fixture;

    fn played() -> LotteryTranscript {
        let mut f = Fixture::new();
        let seed = seed_from_u64(41);
        let winning = f.winning_balls(&seed);
        let losing = f.losing_pick(&seed);

        f.draw();
        f.buy(f.alice, &[&losing]);
        f.finish_round(seed);
        f.buy(f.bob, &[&winning, &losing]);
        f.finish_round(seed);
        let owner_ctx = f.ctx(f.owner);
        f.lottery.kill(&owner_ctx).unwrap();
        f.buy(f.carol, &[&losing]);
        f.finish_round(seed);
        f.lottery.transcript()
    }

    #[test]
    fn test_honest_transcript_verifies() {
        let t = played();
        assert!(t.is_dead);
        let summary = verify_transcript(&t).unwrap();
        assert_eq!(summary.rounds_checked, 4);
        assert_eq!(summary.draws_verified, 3);
    }

    #[test]
    fn test_tampered_pick_detected() {
        let mut t = played();
        t.rounds[1].winning_pick = Some(crate::core::pick::encode(&[1, 2, 3, 4, 5], 5, 36).unwrap());
        // The honest pick could coincide with the forged one for this seed.
        if t.rounds[1].winning_pick != Some(compute_winning_pick(&seed_from_u64(41), 5, 36)) {
            assert!(matches!(
                verify_transcript(&t),
                Err(VerificationError::WinningPickMismatch { game_id: 1, .. })
            ));
        }
    }

    #[test]
    fn test_tampered_rollover_detected() {
        let mut t = played();
        t.rounds[2].rollover.unclaimed_after += 1;
        assert_eq!(verify_transcript(&t), Err(VerificationError::InvalidRollover(2)));
    }

    #[test]
    fn test_tampered_config_detected() {
        let mut t = played();
        t.config.max_ball_value = 40;
        assert_eq!(verify_transcript(&t), Err(VerificationError::ConfigHashMismatch));
    }

    #[test]
    fn test_missing_round_detected() {
        let mut t = played();
        t.rounds.remove(1);
        assert!(matches!(
            verify_transcript(&t),
            Err(VerificationError::RoundOutOfSequence { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_version_checked() {
        let mut t = played();
        t.version = 9;
        assert!(matches!(verify_transcript(&t), Err(VerificationError::VersionMismatch { .. })));
    }
}

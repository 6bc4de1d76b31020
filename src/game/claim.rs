//! Winnings Settlement
//!
//! A ticket is claimable only in the round right after its own. Claiming
//! burns it whatever the outcome, which makes a second claim impossible.
//! Payouts go to the ticket's current holder, not the caller.

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::external::{RandomnessSource, TicketLedger, ValueAsset};
use crate::game::error::LotteryError;
use crate::game::events::LotteryEventData;
use crate::game::lottery::{CallContext, Lottery};
use crate::game::state::{Amount, GameState, TokenId};

/// Result of a successful claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// Ticket matched the winning pick.
    Winner(Amount),
    /// Equal share of a terminal round nobody won.
    Consolation(Amount),
    /// Ticket burned without payout.
    NoWin,
}

impl ClaimOutcome {
    /// Amount paid out.
    pub fn amount(&self) -> Amount {
        match self {
            ClaimOutcome::Winner(a) | ClaimOutcome::Consolation(a) => *a,
            ClaimOutcome::NoWin => 0,
        }
    }
}

impl<L, R, A> Lottery<L, R, A>
where
    L: TicketLedger,
    R: RandomnessSource,
    A: ValueAsset,
{
    /// Settle a ticket from the most recently finished round.
    pub fn claim_winnings(&mut self, ctx: &CallContext, token_id: TokenId) -> Result<ClaimOutcome, LotteryError> {
        self.atomically(|lottery| {
            let state = lottery.current.state;
            if state != GameState::Purchase && state != GameState::Dead {
                return Err(LotteryError::UnexpectedState(state));
            }

            let holder = lottery
                .ticket_ledger
                .owner_of(token_id)
                .ok_or(LotteryError::NonexistentTicket(token_id))?;
            let record = *lottery
                .tickets
                .get(&token_id)
                .ok_or(LotteryError::NonexistentTicket(token_id))?;

            if record.game_id + 1 != lottery.current.id {
                return Err(LotteryError::ClaimWindowMissed(token_id));
            }

            lottery.ticket_ledger.burn(token_id)?;

            let game_id = record.game_id;
            let num_winners = lottery.num_winners(game_id);
            let round = lottery
                .rounds
                .get(&game_id)
                .cloned()
                .unwrap_or_default();
            let unclaimed = lottery.ledger.unclaimed_payouts();

            let outcome = if state == GameState::Dead && num_winners == 0 {
                let remaining = round.tickets_sold - round.claimed_consolations;
                let share = unclaimed / remaining as Amount;
                lottery.ledger.debit_for_claim(share)?;
                if let Some(r) = lottery.rounds.get_mut(&game_id) {
                    r.claimed_consolations += 1;
                }
                lottery.prize_asset.transfer(&holder, share)?;
                lottery.emit(
                    ctx.timestamp,
                    LotteryEventData::ConsolationClaimed {
                        token_id,
                        claimant: holder,
                        value: share,
                    },
                );
                ClaimOutcome::Consolation(share)
            } else if round.winning_pick == Some(record.pick) {
                let remaining = num_winners - round.claimed_winners;
                let share = unclaimed / remaining as Amount;
                lottery.ledger.debit_for_claim(share)?;
                if let Some(r) = lottery.rounds.get_mut(&game_id) {
                    r.claimed_winners += 1;
                }
                lottery.prize_asset.transfer(&holder, share)?;
                lottery.emit(
                    ctx.timestamp,
                    LotteryEventData::WinningsClaimed {
                        token_id,
                        claimant: holder,
                        value: share,
                    },
                );
                ClaimOutcome::Winner(share)
            } else {
                lottery.emit(
                    ctx.timestamp,
                    LotteryEventData::TicketBurned {
                        token_id,
                        claimant: holder,
                    },
                );
                ClaimOutcome::NoWin
            };

            info!(
                token_id,
                game_id,
                holder = %holder.short(),
                ?outcome,
                unclaimed = lottery.ledger.unclaimed_payouts(),
                "ticket claimed"
            );
            Ok(outcome)
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

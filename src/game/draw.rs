//! Draw and Round Advancement
//!
//! ```text
//!   Purchase ──draw()──► DrawPending ──receive_random_words()──► advance
//!      │                     │  ▲                                   │
//!      │ (no tickets)        └──┘ force_redraw()                    ├─► Purchase (next round)
//!      └────────────────────────────────────────────► advance ──────┴─► Dead (terminal)
//! ```
//!
//! Advancement runs exactly once per round: it counts winners, rolls the
//! pools over and moves the round id forward by one.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::core::feistel::Seed;
use crate::external::{RandomnessSource, TicketLedger, ValueAsset};
use crate::game::error::LotteryError;
use crate::game::events::LotteryEventData;
use crate::game::lottery::{CallContext, Lottery};
use crate::game::state::{Amount, GameId, GameState, RandomnessRequest, RequestId, Round};

/// Seconds the randomness source is given to answer a request. Until they
/// pass, the request cannot be replaced by `force_redraw`.
pub const REQUEST_DEADLINE_SECS: u64 = 30;

/// Result of a draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawOutcome {
    /// No tickets were sold; the round ended without randomness.
    Skipped {
        /// Id of the round now active.
        next_game_id: GameId,
    },
    /// Randomness was requested; the round ends on fulfilment.
    Requested {
        /// Source-assigned request id.
        request_id: RequestId,
        /// Price paid from the operational balance.
        price: Amount,
    },
}

impl<L, R, A> Lottery<L, R, A>
where
    L: TicketLedger,
    R: RandomnessSource,
    A: ValueAsset,
{
    /// End ticket sales for the round once its period has elapsed.
    pub fn draw(&mut self, ctx: &CallContext) -> Result<DrawOutcome, LotteryError> {
        self.atomically(|lottery| {
            lottery.require_state(GameState::Purchase)?;

            let game_id = lottery.current.id;
            let round = lottery
                .rounds
                .get(&game_id)
                .cloned()
                .unwrap_or_default();
            let deadline = round.started_at.saturating_add(lottery.config.game_period_secs);
            if ctx.timestamp < deadline {
                return Err(LotteryError::WaitLonger { deadline });
            }

            if round.tickets_sold == 0 {
                lottery.emit(ctx.timestamp, LotteryEventData::DrawSkipped);
                info!(game_id, "no tickets sold, skipping draw");
                lottery.advance_round(ctx.timestamp);
                return Ok(DrawOutcome::Skipped {
                    next_game_id: lottery.current.id,
                });
            }

            lottery.current.state = GameState::DrawPending;
            let (request_id, price) = lottery.request_randomness(ctx, false)?;
            Ok(DrawOutcome::Requested { request_id, price })
        })
    }

    /// Randomness callback. Only the source may call it, only for the
    /// outstanding request.
    pub fn receive_random_words(
        &mut self,
        ctx: &CallContext,
        request_id: RequestId,
        words: &[Seed],
    ) -> Result<(), LotteryError> {
        self.atomically(|lottery| {
            lottery.require_state(GameState::DrawPending)?;

            if ctx.caller != lottery.randomness.address() {
                return Err(LotteryError::CallerNotSource(ctx.caller));
            }
            let expected = lottery
                .randomness_request
                .map(|r| r.request_id)
                .unwrap_or_default();
            if request_id != expected {
                return Err(LotteryError::RequestIdMismatch {
                    actual: request_id,
                    expected,
                });
            }
            let seed = *words.first().ok_or(LotteryError::InsufficientRandomWords)?;

            lottery.randomness_request = None;

            let game_id = lottery.current.id;
            let winning_pick = lottery.compute_winning_pick(&seed);
            if let Some(round) = lottery.rounds.get_mut(&game_id) {
                round.winning_pick = Some(winning_pick);
                round.winning_seed = Some(seed);
            }
            lottery.emit(
                ctx.timestamp,
                LotteryEventData::RandomnessFulfilled {
                    request_id,
                    winning_pick,
                },
            );
            info!(game_id, request_id, %winning_pick, "randomness fulfilled");

            lottery.advance_round(ctx.timestamp);
            Ok(())
        })
    }

    /// Re-issue the randomness request for a stuck draw. Owner only.
    ///
    /// A request is stuck once [`REQUEST_DEADLINE_SECS`] have passed without
    /// fulfilment; before that the redraw fails with `WaitLonger`. The
    /// previous request id stops being accepted.
    pub fn force_redraw(&mut self, ctx: &CallContext) -> Result<DrawOutcome, LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;
            lottery.require_state(GameState::DrawPending)?;

            if let Some(stale) = lottery.randomness_request {
                let deadline = stale.requested_at.saturating_add(REQUEST_DEADLINE_SECS);
                if ctx.timestamp < deadline {
                    return Err(LotteryError::WaitLonger { deadline });
                }
                warn!(request_id = stale.request_id, "forcing redraw");
            }
            let (request_id, price) = lottery.request_randomness(ctx, true)?;
            Ok(DrawOutcome::Requested { request_id, price })
        })
    }

    /// Pay for and record one randomness request.
    fn request_randomness(&mut self, ctx: &CallContext, forced: bool) -> Result<(RequestId, Amount), LotteryError> {
        let price = self.request_price();
        if self.operational_balance < price {
            return Err(LotteryError::InsufficientOperationalFunds {
                required: price,
                available: self.operational_balance,
            });
        }
        self.operational_balance -= price;

        let request_id = self.randomness.request_randomness(
            ctx.timestamp.saturating_add(REQUEST_DEADLINE_SECS),
            self.config.callback_gas_limit,
            price,
        )?;
        self.randomness_request = Some(RandomnessRequest {
            request_id,
            requested_at: ctx.timestamp,
        });
        self.emit(
            ctx.timestamp,
            LotteryEventData::RandomnessRequested {
                request_id,
                price,
                forced,
            },
        );

        info!(game_id = self.current.id, request_id, price, forced, "randomness requested");
        Ok((request_id, price))
    }

    /// Close the current round and open the next (or die).
    fn advance_round(&mut self, timestamp: u64) {
        let game_id = self.current.id;
        let (tickets_sold, winning_pick) = self
            .rounds
            .get(&game_id)
            .map(|r| (r.tickets_sold, r.winning_pick))
            .unwrap_or_default();

        let num_winners = self.num_winners(game_id);
        assert!(
            num_winners <= tickets_sold,
            "round {} has {} winners but sold {} tickets",
            game_id,
            num_winners,
            tickets_sold
        );

        let is_terminal = self.final_game_id == Some(game_id);
        let rollover = self.ledger.rollover(num_winners > 0, is_terminal);
        if let Some(round) = self.rounds.get_mut(&game_id) {
            round.rollover = Some(rollover);
        }
        self.emit(
            timestamp,
            LotteryEventData::GameFinalised {
                winning_pick,
                num_winners,
                rollover,
            },
        );

        self.current.id = game_id + 1;
        if is_terminal {
            self.current.state = GameState::Dead;
            self.emit(timestamp, LotteryEventData::LotteryDead);
            info!(
                game_id,
                num_winners,
                unclaimed = rollover.unclaimed_after,
                "final round finished, lottery dead"
            );
        } else {
            self.current.state = GameState::Purchase;
            self.rounds.insert(self.current.id, Round::new(timestamp));
            info!(
                game_id,
                num_winners,
                jackpot = rollover.jackpot_after,
                unclaimed = rollover.unclaimed_after,
                next_game_id = self.current.id,
                "round finished"
            );
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feistel::seed_from_u64;
    use crate::external::RandomnessError;
    use crate::game::fixtures::Fixture;

    #[test]
    fn test_draw_too_early() {
        let mut f = Fixture::new();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);
        f.advance(599);
        let ctx = f.ctx(f.alice);
        assert_eq!(
            f.lottery.draw(&ctx),
            Err(LotteryError::WaitLonger { deadline: f.now + 1 })
        );
    }

    #[test]
    fn test_zero_ticket_round_skips() {
        let mut f = Fixture::new();
        let min = f.lottery.config().seed_jackpot_min_value;
        f.lottery.seed_jackpot(&f.ctx(f.bob), min).unwrap();
        let requests_before = f.lottery.randomness().last_request_id();

        let outcome = f.draw();

        assert_eq!(outcome, DrawOutcome::Skipped { next_game_id: 1 });
        assert_eq!(f.lottery.current_game().state, GameState::Purchase);
        assert_eq!(f.lottery.current_game().id, 1);
        assert_eq!(f.lottery.jackpot(), min);
        assert_eq!(f.lottery.unclaimed_payouts(), 0);
        assert_eq!(f.lottery.randomness().last_request_id(), requests_before);
        assert_eq!(f.lottery.round(1).unwrap().started_at, f.now);
    }

    #[test]
    fn test_draw_requests_randomness() {
        let mut f = Fixture::new();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);
        let funds_before = f.lottery.operational_balance();

        let outcome = f.draw();

        let price = f.lottery.request_price();
        assert_eq!(outcome, DrawOutcome::Requested { request_id: 1, price });
        assert_eq!(f.lottery.current_game().state, GameState::DrawPending);
        assert_eq!(f.lottery.operational_balance(), funds_before - price);
        let request = f.lottery.randomness_request().unwrap();
        assert_eq!(request.request_id, 1);
        assert_eq!(request.requested_at, f.now);
        assert_eq!(
            f.lottery.randomness().pending_request(1).map(|p| p.deadline),
            Some(f.now + REQUEST_DEADLINE_SECS)
        );
    }

    #[test]
    fn test_draw_without_operational_funds() {
        let mut f = Fixture::uninitialised();
        let owner_ctx = f.ctx(f.owner);
        f.lottery.initialize(&owner_ctx, Default::default()).unwrap();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);
        f.advance(600);

        let ctx = f.ctx(f.alice);
        assert!(matches!(
            f.lottery.draw(&ctx),
            Err(LotteryError::InsufficientOperationalFunds { available: 0, .. })
        ));
        assert_eq!(f.lottery.current_game().state, GameState::Purchase);

        f.lottery.fund_operations(&ctx.with_value(f.lottery.request_price())).unwrap();
        assert!(f.lottery.draw(&ctx).is_ok());
        assert_eq!(f.lottery.operational_balance(), 0);
    }

    #[test]
    fn test_fulfilment_guards() {
        let mut f = Fixture::new();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);

        let vrf_ctx = f.ctx(f.vrf);
        let seed = seed_from_u64(1);
        assert_eq!(
            f.lottery.receive_random_words(&vrf_ctx, 1, &[seed]),
            Err(LotteryError::UnexpectedState(GameState::Purchase))
        );

        f.draw();
        let vrf_ctx = f.ctx(f.vrf);
        let alice_ctx = f.ctx(f.alice);
        assert_eq!(
            f.lottery.receive_random_words(&alice_ctx, 1, &[seed]),
            Err(LotteryError::CallerNotSource(f.alice))
        );
        assert_eq!(
            f.lottery.receive_random_words(&vrf_ctx, 2, &[seed]),
            Err(LotteryError::RequestIdMismatch { actual: 2, expected: 1 })
        );
        assert_eq!(
            f.lottery.receive_random_words(&vrf_ctx, 1, &[]),
            Err(LotteryError::InsufficientRandomWords)
        );
        assert_eq!(f.lottery.current_game().state, GameState::DrawPending);

        f.lottery.receive_random_words(&vrf_ctx, 1, &[seed]).unwrap();
        assert_eq!(f.lottery.randomness_request(), None);
        assert_eq!(f.lottery.current_game(), crate::game::state::CurrentGame { state: GameState::Purchase, id: 1 });

        // Replaying the same fulfilment is rejected by the state gate.
        assert_eq!(
            f.lottery.receive_random_words(&vrf_ctx, 1, &[seed]),
            Err(LotteryError::UnexpectedState(GameState::Purchase))
        );
    }

    #[test]
    fn test_fulfilment_stores_winning_pick() {
        let mut f = Fixture::new();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);
        let seed = seed_from_u64(69420);
        f.finish_round(seed);

        let round = f.lottery.round(0).unwrap();
        assert_eq!(round.winning_pick, Some(f.lottery.compute_winning_pick(&seed)));
        assert_eq!(round.winning_seed, Some(seed));
        assert!(round.rollover.is_some());
    }

    #[test]
    fn test_mock_source_roundtrip() {
        let mut f = Fixture::new();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);
        let DrawOutcome::Requested { request_id, .. } = f.draw() else {
            panic!("expected a randomness request");
        };

        let words = f.lottery.randomness_mut().fulfill(request_id).unwrap();
        let ctx = f.ctx(f.vrf);
        f.lottery.receive_random_words(&ctx, request_id, &words).unwrap();
        assert_eq!(f.lottery.current_game().id, 1);
        assert_eq!(
            f.lottery.randomness_mut().fulfill(request_id),
            Err(RandomnessError::UnknownRequest(request_id))
        );
    }

    #[test]
    fn test_no_winner_rolls_into_jackpot() {
        let mut f = Fixture::new();
        let seed = seed_from_u64(7);
        let losing = f.losing_pick(&seed);
        f.buy(f.alice, &[&losing]);
        let jackpot = f.lottery.jackpot();

        f.finish_round(seed);

        assert_eq!(f.lottery.num_winners(0), 0);
        assert_eq!(f.lottery.jackpot(), jackpot);
        assert_eq!(f.lottery.unclaimed_payouts(), 0);
    }

    #[test]
    fn test_winner_moves_pool_to_unclaimed() {
        let mut f = Fixture::new();
        let seed = seed_from_u64(7);
        let winning = f.winning_balls(&seed);
        f.buy(f.alice, &[&winning, &winning]);
        let jackpot = f.lottery.jackpot();

        f.finish_round(seed);

        assert_eq!(f.lottery.num_winners(0), 2);
        assert_eq!(f.lottery.jackpot(), 0);
        assert_eq!(f.lottery.unclaimed_payouts(), jackpot);
    }

    #[test]
    fn test_force_redraw() {
        let mut f = Fixture::new();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);

        let owner_ctx = f.ctx(f.owner);
        assert_eq!(
            f.lottery.force_redraw(&owner_ctx),
            Err(LotteryError::UnexpectedState(GameState::Purchase))
        );

        f.draw();
        let requested_at = f.now;
        let tickets_before = f.lottery.round(0).unwrap().tickets_sold;
        let alice_ctx = f.ctx(f.alice);
        assert_eq!(
            f.lottery.force_redraw(&alice_ctx),
            Err(LotteryError::Unauthorized(f.alice))
        );

        // An in-flight request cannot be replaced.
        let deadline = requested_at + REQUEST_DEADLINE_SECS;
        for wait in [0, REQUEST_DEADLINE_SECS - 1] {
            let ctx = CallContext::new(f.owner, requested_at + wait);
            assert_eq!(f.lottery.force_redraw(&ctx), Err(LotteryError::WaitLonger { deadline }));
        }
        assert_eq!(f.lottery.randomness_request().map(|r| r.request_id), Some(1));

        f.advance(REQUEST_DEADLINE_SECS);
        let owner_ctx = f.ctx(f.owner);
        let outcome = f.lottery.force_redraw(&owner_ctx).unwrap();
        assert!(matches!(outcome, DrawOutcome::Requested { request_id: 2, .. }));
        assert_eq!(f.lottery.current_game(), crate::game::state::CurrentGame { state: GameState::DrawPending, id: 0 });
        assert_eq!(f.lottery.round(0).unwrap().tickets_sold, tickets_before);

        let vrf_ctx = f.ctx(f.vrf);
        let seed = seed_from_u64(3);
        assert_eq!(
            f.lottery.receive_random_words(&vrf_ctx, 1, &[seed]),
            Err(LotteryError::RequestIdMismatch { actual: 1, expected: 2 })
        );
        f.lottery.receive_random_words(&vrf_ctx, 2, &[seed]).unwrap();
        assert_eq!(f.lottery.current_game().id, 1);
    }

    #[test]
    fn test_redraw_deadline_restarts_with_each_request() {
        let mut f = Fixture::new();
        f.buy(f.alice, &[&[1, 2, 3, 4, 5]]);
        f.draw();

        f.advance(REQUEST_DEADLINE_SECS);
        let ctx = f.ctx(f.owner);
        f.lottery.force_redraw(&ctx).unwrap();

        // The replacement gets its own full window.
        let ctx = f.ctx(f.owner);
        assert_eq!(
            f.lottery.force_redraw(&ctx),
            Err(LotteryError::WaitLonger { deadline: f.now + REQUEST_DEADLINE_SECS })
        );
        f.advance(REQUEST_DEADLINE_SECS);
        let ctx = f.ctx(f.owner);
        assert!(matches!(
            f.lottery.force_redraw(&ctx),
            Ok(DrawOutcome::Requested { request_id: 3, .. })
        ));
    }

    #[test]
    fn test_round_id_advances_by_one_on_every_branch() {
        let mut f = Fixture::new();
        let seed = seed_from_u64(11);

        // Skipped round.
        f.draw();
        assert_eq!(f.lottery.current_game().id, 1);

        // Drawn round without a winner.
        let losing = f.losing_pick(&seed);
        f.buy(f.alice, &[&losing]);
        f.finish_round(seed);
        assert_eq!(f.lottery.current_game().id, 2);

        // Drawn round with a winner.
        let winning = f.winning_balls(&seed);
        f.buy(f.alice, &[&winning]);
        f.finish_round(seed);
        assert_eq!(f.lottery.current_game().id, 3);

        // Terminal round.
        let owner_ctx = f.ctx(f.owner);
        f.lottery.kill(&owner_ctx).unwrap();
        f.buy(f.alice, &[&losing]);
        f.finish_round(seed);
        assert_eq!(f.lottery.current_game(), crate::game::state::CurrentGame { state: GameState::Dead, id: 4 });
        assert!(f.lottery.round(4).is_none());
    }

    #[test]
    fn test_terminal_skip_dies() {
        let mut f = Fixture::new();
        let owner_ctx = f.ctx(f.owner);
        f.lottery.kill(&owner_ctx).unwrap();

        assert_eq!(f.draw(), DrawOutcome::Skipped { next_game_id: 1 });
        assert_eq!(f.lottery.current_game().state, GameState::Dead);
        let ctx = f.ctx(f.alice);
        assert_eq!(
            f.lottery.draw(&ctx),
            Err(LotteryError::UnexpectedState(GameState::Dead))
        );
    }
}

//! Ticket Intake
//!
//! Initialisation, paid purchases, owner grants and jackpot seeding.
//!
//! A purchase pulls the full price from the payer, splits it, credits the
//! jackpot, then records and mints every ticket against the current round.

use tracing::{debug, info};

use crate::core::pick;
use crate::external::{RandomnessSource, TicketLedger, ValueAsset, TICKET_RENDERER_CAPABILITY};
use crate::game::config::LotteryConfig;
use crate::game::error::LotteryError;
use crate::game::events::LotteryEventData;
use crate::game::fees;
use crate::game::lottery::{CallContext, Lottery};
use crate::game::state::{Address, Amount, GameState, Round, Ticket, TicketRecord, TokenId};

impl<L, R, A> Lottery<L, R, A>
where
    L: TicketLedger,
    R: RandomnessSource,
    A: ValueAsset,
{
    /// Configure the lottery and open round 0. One-shot.
    pub fn initialize(&mut self, ctx: &CallContext, config: LotteryConfig) -> Result<(), LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;
            lottery.require_state(GameState::Uninitialised)?;

            config.validate()?;
            if lottery.randomness.address().is_zero() {
                return Err(LotteryError::ZeroRandomnessSource);
            }
            if !lottery.renderer.supports(TICKET_RENDERER_CAPABILITY) {
                return Err(LotteryError::RendererMissingCapability);
            }

            let config_hash = config.config_hash();
            lottery.config = config;
            lottery.current.state = GameState::Purchase;
            lottery.current.id = 0;
            lottery.rounds.insert(0, Round::new(ctx.timestamp));
            lottery.emit(ctx.timestamp, LotteryEventData::Initialised { config_hash });

            info!(
                lottery = %lottery.address.short(),
                name = %lottery.config.name,
                num_picks = lottery.config.num_picks,
                max_ball_value = lottery.config.max_ball_value,
                config_hash = %hex::encode(&config_hash[..8]),
                "lottery initialised"
            );
            Ok(())
        })
    }

    /// Buy tickets, paying from the caller.
    ///
    /// With a registered `beneficiary`, the community share goes straight to
    /// it instead of accruing.
    pub fn purchase(
        &mut self,
        ctx: &CallContext,
        tickets: Vec<Ticket>,
        beneficiary: Option<Address>,
    ) -> Result<Vec<TokenId>, LotteryError> {
        self.atomically(|lottery| {
            lottery.require_state(GameState::Purchase)?;
            if tickets.is_empty() {
                return Err(LotteryError::NoTicketsSpecified);
            }

            let beneficiary = beneficiary.filter(|b| !b.is_zero());
            if let Some(b) = beneficiary {
                if !lottery.beneficiaries.contains_key(&b) {
                    return Err(LotteryError::UnknownBeneficiary(b));
                }
            }

            let total = lottery
                .config
                .ticket_price
                .checked_mul(tickets.len() as Amount)
                .ok_or(LotteryError::AmountOverflow)?;
            let split = fees::split(
                total,
                lottery.config.community_fee_bps,
                lottery.config.protocol_fee_bps,
            );

            let address = lottery.address;
            lottery.prize_asset.transfer_from(&ctx.caller, &address, total)?;

            if split.community > 0 {
                match beneficiary {
                    Some(b) => {
                        lottery.prize_asset.transfer(&b, split.community)?;
                        lottery.emit(
                            ctx.timestamp,
                            LotteryEventData::BeneficiaryPaid {
                                beneficiary: b,
                                value: split.community,
                            },
                        );
                    }
                    None => lottery.ledger.credit_fees(split.community)?,
                }
            }

            if split.protocol > 0 {
                let recipient = lottery.config.protocol_fee_recipient;
                lottery.prize_asset.transfer(&recipient, split.protocol)?;
                lottery.emit(
                    ctx.timestamp,
                    LotteryEventData::ProtocolFeePaid {
                        recipient,
                        value: split.protocol,
                    },
                );
            }

            lottery.ledger.credit(split.jackpot)?;

            let token_ids = lottery.record_tickets(ctx, &tickets)?;
            debug!(
                payer = %ctx.caller.short(),
                count = token_ids.len(),
                total,
                jackpot = lottery.ledger.jackpot(),
                "tickets purchased"
            );
            Ok(token_ids)
        })
    }

    /// Grant tickets without payment. Owner only.
    pub fn owner_pick(&mut self, ctx: &CallContext, tickets: Vec<Ticket>) -> Result<Vec<TokenId>, LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;
            lottery.require_state(GameState::Purchase)?;
            if tickets.is_empty() {
                return Err(LotteryError::NoTicketsSpecified);
            }
            let token_ids = lottery.record_tickets(ctx, &tickets)?;
            debug!(count = token_ids.len(), "tickets granted by owner");
            Ok(token_ids)
        })
    }

    /// Top up the jackpot. Rate limited and minimum-value gated.
    pub fn seed_jackpot(&mut self, ctx: &CallContext, value: Amount) -> Result<(), LotteryError> {
        self.atomically(|lottery| {
            lottery.require_state(GameState::Purchase)?;

            if let Some(last) = lottery.last_seeded_at {
                let allowed_at = last.saturating_add(lottery.config.seed_jackpot_delay_secs);
                if ctx.timestamp < allowed_at {
                    return Err(LotteryError::RateLimited {
                        seconds_to_wait: allowed_at - ctx.timestamp,
                    });
                }
            }
            if value < lottery.config.seed_jackpot_min_value {
                return Err(LotteryError::InsufficientJackpotSeed(value));
            }

            lottery.last_seeded_at = Some(ctx.timestamp);
            let address = lottery.address;
            lottery.prize_asset.transfer_from(&ctx.caller, &address, value)?;
            lottery.ledger.seed(value)?;
            lottery.emit(
                ctx.timestamp,
                LotteryEventData::JackpotSeeded {
                    seeder: ctx.caller,
                    value,
                },
            );

            info!(seeder = %ctx.caller.short(), value, jackpot = lottery.ledger.jackpot(), "jackpot seeded");
            Ok(())
        })
    }

    /// Validate, record and mint tickets against the current round.
    fn record_tickets(&mut self, ctx: &CallContext, tickets: &[Ticket]) -> Result<Vec<TokenId>, LotteryError> {
        let game_id = self.current.id;
        let mut token_ids = Vec::with_capacity(tickets.len());

        for ticket in tickets {
            let pick = pick::encode(&ticket.picks, self.config.num_picks, self.config.max_ball_value)?;

            let token_id = self.next_token_id;
            self.next_token_id += 1;

            self.tickets.insert(token_id, TicketRecord { game_id, pick });
            self.tokens_by_pick.insert((game_id, pick, token_id), ());
            if let Some(round) = self.rounds.get_mut(&game_id) {
                round.tickets_sold += 1;
            }

            self.ticket_ledger.mint(&ticket.owner, token_id)?;
            self.emit(
                ctx.timestamp,
                LotteryEventData::TicketPurchased {
                    token_id,
                    owner: ticket.owner,
                    pick,
                },
            );
            token_ids.push(token_id);
        }

        Ok(token_ids)
    }
}

// =============================================================================
// TESTS
// =============================================================================

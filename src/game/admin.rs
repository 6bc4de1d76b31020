//! Privileged Operations
//!
//! Termination, the beneficiary registry, fee withdrawal, operational funds
//! and rescues. Rescues only ever release money the ledger does not owe.

use tracing::{info, warn};

use crate::external::{RandomnessSource, TicketLedger, ValueAsset};
use crate::game::error::LotteryError;
use crate::game::events::{LotteryEventData, RescueKind};
use crate::game::lottery::{CallContext, Lottery};
use crate::game::state::{Address, Amount, GameState};

impl<L, R, A> Lottery<L, R, A>
where
    L: TicketLedger,
    R: RandomnessSource,
    A: ValueAsset,
{
    /// Make the current round the last one.
    pub fn kill(&mut self, ctx: &CallContext) -> Result<(), LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;
            lottery.require_state(GameState::Purchase)?;
            if lottery.final_game_id.is_some() {
                return Err(LotteryError::AlreadyTerminal);
            }

            let final_game_id = lottery.current.id;
            lottery.final_game_id = Some(final_game_id);
            lottery.emit(ctx.timestamp, LotteryEventData::TerminationScheduled { final_game_id });

            warn!(final_game_id, "termination scheduled");
            Ok(())
        })
    }

    /// Add or remove a beneficiary.
    pub fn set_beneficiary(
        &mut self,
        ctx: &CallContext,
        beneficiary: Address,
        display_name: &str,
        is_beneficiary: bool,
    ) -> Result<(), LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;

            if is_beneficiary {
                lottery.beneficiaries.insert(beneficiary, display_name.to_string());
            } else {
                lottery.beneficiaries.remove(&beneficiary);
            }
            lottery.emit(
                ctx.timestamp,
                LotteryEventData::BeneficiarySet {
                    beneficiary,
                    display_name: display_name.to_string(),
                    is_beneficiary,
                },
            );

            info!(beneficiary = %beneficiary, display_name, is_beneficiary, "beneficiary updated");
            Ok(())
        })
    }

    /// Pay accrued community fees to the owner.
    pub fn withdraw_accrued_fees(&mut self, ctx: &CallContext) -> Result<Amount, LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;

            let value = lottery.ledger.withdraw_fees();
            if value == 0 {
                return Err(LotteryError::NoFeesAccrued);
            }
            lottery.prize_asset.transfer(&ctx.caller, value)?;
            lottery.emit(
                ctx.timestamp,
                LotteryEventData::AccruedFeesWithdrawn {
                    to: ctx.caller,
                    value,
                },
            );

            info!(value, "accrued fees withdrawn");
            Ok(value)
        })
    }

    /// Add the attached native value to the operational balance.
    pub fn fund_operations(&mut self, ctx: &CallContext) -> Result<(), LotteryError> {
        self.atomically(|lottery| {
            lottery.operational_balance = lottery
                .operational_balance
                .checked_add(ctx.value)
                .ok_or(LotteryError::AmountOverflow)?;
            lottery.emit(
                ctx.timestamp,
                LotteryEventData::OperationsFunded {
                    from: ctx.caller,
                    value: ctx.value,
                },
            );
            Ok(())
        })
    }

    /// Withdraw the whole operational balance to the owner.
    pub fn rescue_operational_funds(&mut self, ctx: &CallContext) -> Result<Amount, LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;

            let value = std::mem::take(&mut lottery.operational_balance);
            lottery.emit(
                ctx.timestamp,
                LotteryEventData::Rescued {
                    kind: RescueKind::OperationalFunds,
                    to: ctx.caller,
                    value,
                },
            );

            info!(value, "operational funds rescued");
            Ok(value)
        })
    }

    /// Send the prize asset the lottery holds beyond what it owes.
    ///
    /// Once dead with an empty final round nothing can ever be claimed, so
    /// the whole balance is released and the ledger zeroed.
    pub fn rescue_prize_asset(&mut self, ctx: &CallContext) -> Result<Amount, LotteryError> {
        self.atomically(|lottery| {
            lottery.only_owner(ctx)?;

            let balance = lottery.prize_asset.balance_of(&lottery.address);
            let final_round_empty = lottery.current.state == GameState::Dead
                && lottery
                    .current
                    .id
                    .checked_sub(1)
                    .and_then(|id| lottery.rounds.get(&id))
                    .map(|r| r.tickets_sold == 0)
                    .unwrap_or(true);

            if final_round_empty {
                let released = lottery.ledger.clear();
                if released > 0 {
                    warn!(released, "releasing pooled funds of a dead lottery with no tickets");
                }
            }

            let excess = balance.saturating_sub(lottery.ledger.locked());
            if excess > 0 {
                lottery.prize_asset.transfer(&ctx.caller, excess)?;
            }
            lottery.emit(
                ctx.timestamp,
                LotteryEventData::Rescued {
                    kind: RescueKind::PrizeAsset,
                    to: ctx.caller,
                    value: excess,
                },
            );

            info!(excess, locked = lottery.ledger.locked(), "prize asset rescued");
            Ok(excess)
        })
    }

    /// Sweep another token held by the lottery to the owner.
    pub fn rescue_other_asset<V: ValueAsset>(&mut self, ctx: &CallContext, asset: &mut V) -> Result<Amount, LotteryError> {
        self.only_owner(ctx)?;

        let value = asset.balance_of(&self.address);
        if value > 0 {
            asset.transfer(&ctx.caller, value)?;
        }
        self.emit(
            ctx.timestamp,
            LotteryEventData::Rescued {
                kind: RescueKind::OtherAsset,
                to: ctx.caller,
                value,
            },
        );

        info!(value, "other asset rescued");
        Ok(value)
    }
}

// =============================================================================
// TESTS
// =============================================================================

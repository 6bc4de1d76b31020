//! Lottery Events
//!
//! Structured log of everything a lottery did, buffered on the instance and
//! drained by the caller. Consumed by the service layer and the demo binary.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::core::pick::PickSet;
use crate::game::ledger::Rollover;
use crate::game::state::{Address, Amount, GameId, RequestId, TokenId};

/// Which balance a rescue drew from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueKind {
    /// Excess prize asset.
    PrizeAsset,
    /// Any other token held by the lottery.
    OtherAsset,
    /// Operational balance reserved for randomness requests.
    OperationalFunds,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryEventData {
    /// Lottery configured and round 0 opened
    Initialised {
        /// Hash of the accepted configuration.
        config_hash: StateHash,
    },

    /// Ticket minted
    TicketPurchased {
        /// Ticket concerned.
        token_id: TokenId,
        /// Account the ticket was minted to.
        owner: Address,
        /// Ticket pick.
        pick: PickSet,
    },

    /// Community share routed to a beneficiary
    BeneficiaryPaid {
        /// Beneficiary account.
        beneficiary: Address,
        /// Amount moved.
        value: Amount,
    },

    /// Protocol share routed to the fee recipient
    ProtocolFeePaid {
        /// Protocol fee recipient.
        recipient: Address,
        /// Amount moved.
        value: Amount,
    },

    /// Jackpot topped up
    JackpotSeeded {
        /// Account that seeded.
        seeder: Address,
        /// Amount moved.
        value: Amount,
    },

    /// Round with no tickets ended without a draw
    DrawSkipped,

    /// Randomness requested for the round
    RandomnessRequested {
        /// Randomness request id.
        request_id: RequestId,
        /// Price paid from the operational balance.
        price: Amount,
        /// Issued by `force_redraw`.
        forced: bool,
    },

    /// Randomness delivered and winning pick derived
    RandomnessFulfilled {
        /// Randomness request id.
        request_id: RequestId,
        /// Winning pick of the round.
        winning_pick: PickSet,
    },

    /// Round ended and pools reallocated
    GameFinalised {
        /// Winning pick of the round.
        winning_pick: Option<PickSet>,
        /// Winning tickets in the round.
        num_winners: u64,
        /// Pool reallocation applied.
        rollover: Rollover,
    },

    /// Lottery entered its terminal state
    LotteryDead,

    /// Winning ticket paid
    WinningsClaimed {
        /// Ticket concerned.
        token_id: TokenId,
        /// Holder the ticket was settled for.
        claimant: Address,
        /// Amount moved.
        value: Amount,
    },

    /// Consolation share paid
    ConsolationClaimed {
        /// Ticket concerned.
        token_id: TokenId,
        /// Holder the ticket was settled for.
        claimant: Address,
        /// Amount moved.
        value: Amount,
    },

    /// Losing ticket burned without payout
    TicketBurned {
        /// Ticket concerned.
        token_id: TokenId,
        /// Holder the ticket was settled for.
        claimant: Address,
    },

    /// Termination latched for the end of the current round
    TerminationScheduled {
        /// Last round that will be played.
        final_game_id: GameId,
    },

    /// Beneficiary registry changed
    BeneficiarySet {
        /// Beneficiary account.
        beneficiary: Address,
        /// Name shown for the beneficiary.
        display_name: String,
        /// Whether the account is now registered.
        is_beneficiary: bool,
    },

    /// Accrued community fees paid out
    AccruedFeesWithdrawn {
        /// Receiving account.
        to: Address,
        /// Amount moved.
        value: Amount,
    },

    /// Operational balance topped up
    OperationsFunded {
        /// Funding account.
        from: Address,
        /// Amount moved.
        value: Amount,
    },

    /// Stray or released funds swept to the owner
    Rescued {
        /// What was rescued.
        kind: RescueKind,
        /// Receiving account.
        to: Address,
        /// Amount moved.
        value: Amount,
    },
}

/// An event stamped with when and in which round it happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryEvent {
    /// Timestamp of the operation that emitted it
    pub timestamp: u64,

    /// Round active when it was emitted
    pub game_id: GameId,

    /// Event data
    pub data: LotteryEventData,
}

impl LotteryEvent {
    /// Create a new event.
    pub fn new(timestamp: u64, game_id: GameId, data: LotteryEventData) -> Self {
        Self {
            timestamp,
            game_id,
            data,
        }
    }

    /// Short name of the event kind, for logs.
    pub fn kind(&self) -> &'static str {
        match &self.data {
            LotteryEventData::Initialised { .. } => "initialised",
            LotteryEventData::TicketPurchased { .. } => "ticket_purchased",
            LotteryEventData::BeneficiaryPaid { .. } => "beneficiary_paid",
            LotteryEventData::ProtocolFeePaid { .. } => "protocol_fee_paid",
            LotteryEventData::JackpotSeeded { .. } => "jackpot_seeded",
            LotteryEventData::DrawSkipped => "draw_skipped",
            LotteryEventData::RandomnessRequested { .. } => "randomness_requested",
            LotteryEventData::RandomnessFulfilled { .. } => "randomness_fulfilled",
            LotteryEventData::GameFinalised { .. } => "game_finalised",
            LotteryEventData::LotteryDead => "lottery_dead",
            LotteryEventData::WinningsClaimed { .. } => "winnings_claimed",
            LotteryEventData::ConsolationClaimed { .. } => "consolation_claimed",
            LotteryEventData::TicketBurned { .. } => "ticket_burned",
            LotteryEventData::TerminationScheduled { .. } => "termination_scheduled",
            LotteryEventData::BeneficiarySet { .. } => "beneficiary_set",
            LotteryEventData::AccruedFeesWithdrawn { .. } => "accrued_fees_withdrawn",
            LotteryEventData::OperationsFunded { .. } => "operations_funded",
            LotteryEventData::Rescued { .. } => "rescued",
        }
    }

    /// Amount paid to a claimant, if this is a payout.
    pub fn payout(&self) -> Option<Amount> {
        match &self.data {
            LotteryEventData::WinningsClaimed { value, .. }
            | LotteryEventData::ConsolationClaimed { value, .. } => Some(*value),
            _ => None,
        }
    }
}

//! Lottery Errors
//!
//! Every failure an operation can report. Each is distinct so callers can
//! branch on the kind. A failed operation leaves no trace in the lottery.

use thiserror::Error;

use crate::core::pick::PickError;
use crate::external::{AssetError, RandomnessError, TicketLedgerError};
use crate::game::config::ConfigError;
use crate::game::ledger::LedgerError;
use crate::game::state::{Address, Amount, GameState, RequestId, TokenId};

/// Operation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LotteryError {
    // State gates
    /// Operation not allowed in the current state.
    #[error("unexpected state: {0}")]
    UnexpectedState(GameState),

    /// Caller lacks the privilege.
    #[error("{0} is not authorised")]
    Unauthorized(Address),

    /// `kill` called twice.
    #[error("termination already scheduled")]
    AlreadyTerminal,

    // Validation
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Ticket pick rejected.
    #[error(transparent)]
    Pick(#[from] PickError),

    /// Randomness source has no address.
    #[error("randomness source address is zero")]
    ZeroRandomnessSource,

    /// Renderer does not support ticket rendering.
    #[error("renderer does not advertise the ticket renderer capability")]
    RendererMissingCapability,

    /// Empty ticket list.
    #[error("no tickets specified")]
    NoTicketsSpecified,

    /// Beneficiary not in the registry.
    #[error("unknown beneficiary {0}")]
    UnknownBeneficiary(Address),

    /// Too early; retry at `deadline`.
    #[error("too early to draw, wait until {deadline}")]
    WaitLonger {
        /// First timestamp the call can succeed.
        deadline: u64,
    },

    /// Jackpot seeded too recently.
    #[error("jackpot seeding rate limited, wait {seconds_to_wait}s")]
    RateLimited {
        /// Seconds until seeding reopens.
        seconds_to_wait: u64,
    },

    /// Seeding below the configured minimum.
    #[error("jackpot seed of {0} below minimum")]
    InsufficientJackpotSeed(Amount),

    // Randomness callback
    /// Randomness delivered by someone other than the source.
    #[error("{0} is not the randomness source")]
    CallerNotSource(Address),

    /// Delivered words answer a stale or unknown request.
    #[error("request id {actual} does not match outstanding request {expected}")]
    RequestIdMismatch {
        /// Id that was delivered.
        actual: RequestId,
        /// Id of the outstanding request.
        expected: RequestId,
    },

    /// Fulfilment carried no words.
    #[error("no random words supplied")]
    InsufficientRandomWords,

    // Claims
    /// Ticket not minted or already burned.
    #[error("ticket {0} does not exist")]
    NonexistentTicket(TokenId),

    /// Ticket is not from the round that just ended.
    #[error("claim window missed for ticket {0}")]
    ClaimWindowMissed(TokenId),

    // Resources
    /// Operational balance cannot pay for randomness.
    #[error("operational balance {available} below randomness price {required}")]
    InsufficientOperationalFunds {
        /// Request price.
        required: Amount,
        /// Operational balance.
        available: Amount,
    },

    /// Nothing to withdraw.
    #[error("no accrued fees to withdraw")]
    NoFeesAccrued,

    /// Amount arithmetic left the `Amount` range.
    #[error("amount overflows")]
    AmountOverflow,

    // Collaborators
    /// Jackpot ledger refused the change.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Prize asset transfer failed.
    #[error("asset transfer failed: {0}")]
    Asset(#[from] AssetError),

    /// Ticket registry failed.
    #[error("ticket registry failed: {0}")]
    TicketLedger(#[from] TicketLedgerError),

    /// Randomness request failed.
    #[error("randomness request failed: {0}")]
    Randomness(#[from] RandomnessError),
}

impl LotteryError {
    /// Whether retrying later can succeed without changing the inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LotteryError::WaitLonger { .. }
                | LotteryError::RateLimited { .. }
                | LotteryError::InsufficientOperationalFunds { .. }
                | LotteryError::UnexpectedState(GameState::DrawPending)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_display() {
        let err: LotteryError = PickError::BallOutOfRange { value: 41, max: 36 }.into();
        assert_eq!(err.to_string(), "ball 41 out of range (max 36)");

        let err = LotteryError::UnexpectedState(GameState::Dead);
        assert_eq!(err.to_string(), "unexpected state: Dead");
    }

    #[test]
    fn test_retryable() {
        assert!(LotteryError::WaitLonger { deadline: 5 }.is_retryable());
        assert!(!LotteryError::NoTicketsSpecified.is_retryable());
        assert!(!LotteryError::UnexpectedState(GameState::Dead).is_retryable());
    }
}

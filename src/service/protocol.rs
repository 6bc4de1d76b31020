//! Service Protocol
//!
//! Request and response types for driving lottery instances through the
//! [`LotteryManager`](super::manager::LotteryManager).
//!
//! ## Message Flow
//!
//! ```text
//! Client                                  Manager
//!   |                                        |
//!   |-- RequestEnvelope { Purchase } ------->|
//!   |<-- LotteryResponse::Executed ----------|  (result + events)
//!   |                                        |
//!   |-- RequestEnvelope { Draw } ----------->|
//!   |<-- LotteryResponse::Executed ----------|  (DrawOutcome)
//!   |                                        |
//!   |-- RequestEnvelope { ClaimWinnings } -->|
//!   |<-- LotteryResponse::Error -------------|  (ErrorCode)
//! ```
//!
//! Enums are externally tagged: amounts are `u128`, which serde cannot
//! buffer through internally tagged representations.

use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::feistel::Seed;
use crate::game::claim::ClaimOutcome;
use crate::game::draw::DrawOutcome;
use crate::game::error::LotteryError;
use crate::game::events::LotteryEvent;
use crate::game::ledger::LedgerError;
use crate::game::state::{Address, Amount, GameId, GameState, RequestId, Ticket, TokenId};

/// Identifier of a lottery instance inside a manager.
pub type LotteryId = Uuid;

// =============================================================================
// Requests
// =============================================================================

/// One call against one lottery instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Target instance.
    pub lottery_id: LotteryId,
    /// Account making the call.
    pub caller: Address,
    /// Wall-clock time of the call (unix seconds).
    pub timestamp: u64,
    /// Native value attached to the call.
    #[serde(default)]
    pub value: Amount,
    /// The operation.
    pub request: LotteryRequest,
}

/// Operations a client can request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryRequest {
    /// Buy tickets, optionally naming a beneficiary.
    Purchase {
        /// Tickets to record.
        tickets: Vec<Ticket>,
        /// Registered beneficiary to receive the community share.
        #[serde(default)]
        beneficiary: Option<Address>,
    },

    /// Grant free tickets (owner).
    OwnerPick {
        /// Tickets to record.
        tickets: Vec<Ticket>,
    },

    /// Add to the jackpot.
    SeedJackpot {
        /// Amount in the prize asset.
        value: Amount,
    },

    /// End ticket sales for the current round.
    Draw,

    /// Deliver random words (randomness source only).
    ReceiveRandomWords {
        /// Randomness request id.
        request_id: RequestId,
        /// Random words, the first one is used.
        words: Vec<Seed>,
    },

    /// Have the in-process randomness source answer its outstanding request.
    FulfillRandomness,

    /// Re-issue a stuck randomness request (owner).
    ForceRedraw,

    /// Settle a ticket.
    ClaimWinnings {
        /// Ticket concerned.
        token_id: TokenId,
    },

    /// Schedule termination after the current round (owner).
    Kill,

    /// Add or remove a beneficiary (owner).
    SetBeneficiary {
        /// Registered beneficiary to receive the community share.
        beneficiary: Address,
        /// Name shown for the beneficiary.
        display_name: String,
        /// Whether the account is now registered.
        is_beneficiary: bool,
    },

    /// Pay accrued community fees to the owner.
    WithdrawAccruedFees,

    /// Credit the envelope's value to the operational balance.
    FundOperations,

    /// Withdraw the operational balance (owner).
    RescueOperationalFunds,

    /// Sweep excess prize asset (owner).
    RescuePrizeAsset,

    /// Mint and approve prize asset for an account. Development only.
    Faucet {
        /// Account to fund.
        account: Address,
        /// Amount in the prize asset.
        value: Amount,
    },

    /// Snapshot of the instance.
    GetStatus,

    /// Finished rounds as hex-encoded bincode transcript bytes.
    GetTranscript,
}

impl LotteryRequest {
    /// Whether the request leaves the instance untouched.
    pub fn is_read_only(&self) -> bool {
        matches!(self, LotteryRequest::GetStatus | LotteryRequest::GetTranscript)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LotteryRequest::Purchase { .. } => "purchase",
            LotteryRequest::OwnerPick { .. } => "owner_pick",
            LotteryRequest::SeedJackpot { .. } => "seed_jackpot",
            LotteryRequest::Draw => "draw",
            LotteryRequest::ReceiveRandomWords { .. } => "receive_random_words",
            LotteryRequest::FulfillRandomness => "fulfill_randomness",
            LotteryRequest::ForceRedraw => "force_redraw",
            LotteryRequest::ClaimWinnings { .. } => "claim_winnings",
            LotteryRequest::Kill => "kill",
            LotteryRequest::SetBeneficiary { .. } => "set_beneficiary",
            LotteryRequest::WithdrawAccruedFees => "withdraw_accrued_fees",
            LotteryRequest::FundOperations => "fund_operations",
            LotteryRequest::RescueOperationalFunds => "rescue_operational_funds",
            LotteryRequest::RescuePrizeAsset => "rescue_prize_asset",
            LotteryRequest::Faucet { .. } => "faucet",
            LotteryRequest::GetStatus => "get_status",
            LotteryRequest::GetTranscript => "get_transcript",
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Answer to a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryResponse {
    /// A mutating operation succeeded.
    Executed {
        /// Operation result.
        result: OperationResult,
        /// Events the operation emitted.
        events: Vec<LotteryEvent>,
    },

    /// Instance snapshot.
    Status(LotteryStatus),

    /// Transcript bytes, hex encoded.
    Transcript {
        /// Hex-encoded bincode transcript.
        bytes: String,
    },

    /// The request failed and changed nothing.
    Error(ServiceError),
}

/// Value returned by a successful mutating operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    /// Nothing beyond the events.
    Unit,
    /// Minted ticket ids.
    Tickets(Vec<TokenId>),
    /// Outcome of a draw or redraw.
    Draw(DrawOutcome),
    /// Outcome of a claim.
    Claim(ClaimOutcome),
    /// Amount transferred.
    Amount(Amount),
}

/// Read-only view of one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryStatus {
    /// Manager-assigned id.
    pub lottery_id: LotteryId,
    /// Account holding the lottery's funds.
    pub address: Address,
    /// Configured display name.
    pub name: String,
    /// Current state.
    pub state: GameState,
    /// Current round id.
    pub game_id: GameId,
    /// Tickets sold in the current round.
    pub tickets_sold: u64,
    /// Jackpot pool.
    pub jackpot: Amount,
    /// Prize money reserved for the last finished round.
    pub unclaimed_payouts: Amount,
    /// Community fees awaiting withdrawal.
    pub accrued_community_fees: Amount,
    /// Balance reserved for randomness requests.
    pub operational_balance: Amount,
    /// Minted tickets not yet burned.
    pub live_tickets: u64,
    /// Whether termination is scheduled.
    pub is_terminal_pending: bool,
    /// Outstanding randomness request.
    pub pending_request: Option<RequestId>,
    /// Hex-encoded state hash.
    pub state_hash: String,
}

// =============================================================================
// Errors
// =============================================================================

/// Error returned to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServiceError {
    /// Build from a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&LotteryError> for ServiceError {
    fn from(err: &LotteryError) -> Self {
        Self::new(ErrorCode::from(err), err.to_string())
    }
}

/// Stable failure kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Operation not allowed in the current state.
    UnexpectedState,
    /// Caller lacks the required role.
    Unauthorized,
    /// Termination already scheduled.
    AlreadyTerminal,
    /// Configuration rejected.
    InvalidConfig,
    /// Pick rejected by the codec.
    InvalidPick,
    /// Randomness source address is zero.
    ZeroRandomnessSource,
    /// Renderer lacks the ticket capability.
    RendererMissingCapability,
    /// Empty ticket list.
    NoTicketsSpecified,
    /// Beneficiary not registered.
    UnknownBeneficiary,
    /// Round period not over yet.
    WaitLonger,
    /// Jackpot seeding too soon.
    RateLimited,
    /// Jackpot seed below minimum.
    InsufficientJackpotSeed,
    /// Callback from someone other than the source.
    CallerNotSource,
    /// Callback for a stale or unknown request.
    RequestIdMismatch,
    /// Callback without words.
    InsufficientRandomWords,
    /// Ticket does not exist.
    NonexistentTicket,
    /// Ticket outside its claim window.
    ClaimWindowMissed,
    /// Not enough balance to pay for randomness.
    InsufficientOperationalFunds,
    /// No fees to withdraw.
    NoFeesAccrued,
    /// Arithmetic on an amount would overflow.
    AmountOverflow,
    /// Payout exceeds unclaimed pool.
    InsufficientUnclaimedPayouts,
    /// Asset transfer failed.
    AssetTransferFailed,
    /// Ticket registry rejected the call.
    TicketLedgerFailed,
    /// Randomness source rejected the call.
    RandomnessFailed,
    /// Lottery id unknown to the manager.
    LotteryNotFound,
    /// Nothing outstanding to fulfil.
    NoPendingRequest,
    /// Malformed request.
    InvalidRequest,
    /// Unexpected server-side failure.
    Internal,
}

impl From<&LotteryError> for ErrorCode {
    fn from(err: &LotteryError) -> Self {
        match err {
            LotteryError::UnexpectedState(_) => ErrorCode::UnexpectedState,
            LotteryError::Unauthorized(_) => ErrorCode::Unauthorized,
            LotteryError::AlreadyTerminal => ErrorCode::AlreadyTerminal,
            LotteryError::Config(_) => ErrorCode::InvalidConfig,
            LotteryError::Pick(_) => ErrorCode::InvalidPick,
            LotteryError::ZeroRandomnessSource => ErrorCode::ZeroRandomnessSource,
            LotteryError::RendererMissingCapability => ErrorCode::RendererMissingCapability,
            LotteryError::NoTicketsSpecified => ErrorCode::NoTicketsSpecified,
            LotteryError::UnknownBeneficiary(_) => ErrorCode::UnknownBeneficiary,
            LotteryError::WaitLonger { .. } => ErrorCode::WaitLonger,
            LotteryError::RateLimited { .. } => ErrorCode::RateLimited,
            LotteryError::InsufficientJackpotSeed(_) => ErrorCode::InsufficientJackpotSeed,
            LotteryError::CallerNotSource(_) => ErrorCode::CallerNotSource,
            LotteryError::RequestIdMismatch { .. } => ErrorCode::RequestIdMismatch,
            LotteryError::InsufficientRandomWords => ErrorCode::InsufficientRandomWords,
            LotteryError::NonexistentTicket(_) => ErrorCode::NonexistentTicket,
            LotteryError::ClaimWindowMissed(_) => ErrorCode::ClaimWindowMissed,
            LotteryError::InsufficientOperationalFunds { .. } => ErrorCode::InsufficientOperationalFunds,
            LotteryError::NoFeesAccrued => ErrorCode::NoFeesAccrued,
            LotteryError::AmountOverflow | LotteryError::Ledger(LedgerError::Overflow { .. }) => ErrorCode::AmountOverflow,
            LotteryError::Ledger(_) => ErrorCode::InsufficientUnclaimedPayouts,
            LotteryError::Asset(_) => ErrorCode::AssetTransferFailed,
            LotteryError::TicketLedger(_) => ErrorCode::TicketLedgerFailed,
            LotteryError::Randomness(_) => ErrorCode::RandomnessFailed,
        }
    }
}

// =============================================================================
// Serialization Helpers
// =============================================================================

impl RequestEnvelope {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl LotteryResponse {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    /// Error response helper.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        LotteryResponse::Error(ServiceError::new(code, message))
    }

    /// Error code, if this is an error response.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            LotteryResponse::Error(e) => Some(e.code),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Lottery Engine
//!
//! The round state machine and the accounting behind it. Deterministic:
//! time and randomness come in through call contexts and callbacks.
//!
//! ## Module Structure
//!
//! - `state`: Identities, rounds, tickets, the current-game pointer
//! - `config`: Parameters and their validation
//! - `fees`: Revenue split
//! - `ledger`: Jackpot, unclaimed payouts, accrued fees, rollover
//! - `lottery`: The instance, read accessors, all-or-nothing wrapper
//! - `purchase`: Initialisation, purchases, owner grants, seeding
//! - `draw`: Draw, randomness callback, round advancement
//! - `claim`: Settlement of finished rounds
//! - `admin`: Termination, beneficiaries, fees, rescues
//! - `events`: Structured event log
//! - `error`: Operation failures

pub mod state;
pub mod config;
pub mod fees;
pub mod ledger;
pub mod lottery;
pub mod purchase;
pub mod draw;
pub mod claim;
pub mod admin;
pub mod events;
pub mod error;

#[cfg(test)]
pub(crate) mod fixtures;
mod proptest_rounds;

// Re-export key types
pub use state::{Address, Amount, CurrentGame, GameId, GameState, RandomnessRequest, Round, Ticket, TicketRecord, TokenId};
pub use config::{LotteryConfig, ConfigError, MIN_GAME_PERIOD_SECS};
pub use ledger::{JackpotLedger, Rollover};
pub use lottery::{CallContext, InMemoryLottery, Lottery};
pub use draw::DrawOutcome;
pub use claim::ClaimOutcome;
pub use events::{LotteryEvent, LotteryEventData};
pub use error::LotteryError;

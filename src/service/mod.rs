//! Service Module
//!
//! Hosts lottery instances and drives them with serialisable requests.
//! Unlike `game/`, this layer reads no clock itself but does use async locks.
//!
//! ## Module Structure
//!
//! - `protocol`: Request, response and error-code types
//! - `manager`: Instance registry and request dispatch

pub mod protocol;
pub mod manager;

pub use protocol::{
    ErrorCode, LotteryId, LotteryRequest, LotteryResponse, LotteryStatus, OperationResult,
    RequestEnvelope, ServiceError,
};
pub use manager::{LotteryManager, LotterySetup, ManagerError};

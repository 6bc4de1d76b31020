//! External Collaborators
//!
//! Narrow interfaces the lottery consumes, each with an in-memory
//! implementation. Every stateful collaborator implements [`Snapshot`] so a
//! failed lottery operation can undo what it did to them.
//!
//! - `ticket_ledger`: ticket ownership (mint, burn, owner lookup)
//! - `randomness`: paid randomness requests, delivered by callback
//! - `asset`: the fungible prize token
//! - `renderer`: ticket display metadata

pub mod ticket_ledger;
pub mod randomness;
pub mod asset;
pub mod renderer;

/// Collaborator state that takes part in an operation's all-or-nothing scope.
///
/// Between `start_snapshot` and `end_snapshot(false)` every change must be
/// undoable, at a cost proportional to the changes made.
pub trait Snapshot {
    /// Start recording changes.
    fn start_snapshot(&mut self);

    /// Stop recording. Changes are undone unless `keep` is set.
    fn end_snapshot(&mut self, keep: bool);
}

pub use ticket_ledger::{TicketLedger, TicketLedgerError, InMemoryTicketLedger};
pub use randomness::{RandomnessSource, RandomnessError, MockRandomnessSource};
pub use asset::{ValueAsset, AssetError, InMemoryAsset};
pub use renderer::{TicketRenderer, JsonTicketRenderer, TICKET_RENDERER_CAPABILITY};

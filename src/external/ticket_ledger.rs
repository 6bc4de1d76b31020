//! Ticket Ownership Registry
//!
//! Non-fungible ownership of tickets. The lottery mints on purchase, burns on
//! claim and only ever reads ownership otherwise; holders move tickets through
//! the registry directly.

use thiserror::Error;

use super::Snapshot;
use crate::core::journal::JournaledMap;
use crate::game::state::{Address, TokenId};

/// Ticket registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketLedgerError {
    /// Token id already in use.
    #[error("ticket {0} already exists")]
    AlreadyMinted(TokenId),

    /// Token id never minted or already burned.
    #[error("ticket {0} not found")]
    NotFound(TokenId),

    /// Transfer attempted by someone other than the holder.
    #[error("{caller} does not own ticket {token_id}")]
    NotOwner {
        /// Ticket being moved.
        token_id: TokenId,
        /// Account that tried to move it.
        caller: Address,
    },

    /// Tickets cannot be held by the zero address.
    #[error("cannot assign a ticket to the zero address")]
    ZeroAddress,
}

/// Ownership registry consumed by the lottery.
pub trait TicketLedger: Snapshot {
    /// Create `token_id` owned by `owner`.
    fn mint(&mut self, owner: &Address, token_id: TokenId) -> Result<(), TicketLedgerError>;

    /// Destroy `token_id`.
    fn burn(&mut self, token_id: TokenId) -> Result<(), TicketLedgerError>;

    /// Current owner, `None` once burned or if never minted.
    fn owner_of(&self, token_id: TokenId) -> Option<Address>;

    /// Move a ticket between holders.
    fn transfer(&mut self, from: &Address, to: &Address, token_id: TokenId) -> Result<(), TicketLedgerError>;

    /// Number of tickets held by `owner`.
    fn balance_of(&self, owner: &Address) -> usize;
}

/// Map-backed registry.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTicketLedger {
    owners: JournaledMap<TokenId, Address>,
}

impl InMemoryTicketLedger {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tickets currently in existence.
    pub fn total_supply(&self) -> usize {
        self.owners.len()
    }

    /// Token ids held by `owner`, ascending.
    pub fn tokens_of(&self, owner: &Address) -> Vec<TokenId> {
        self.owners
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Snapshot for InMemoryTicketLedger {
    fn start_snapshot(&mut self) {
        self.owners.start_snapshot();
    }

    fn end_snapshot(&mut self, keep: bool) {
        self.owners.end_snapshot(keep);
    }
}

impl TicketLedger for InMemoryTicketLedger {
    fn mint(&mut self, owner: &Address, token_id: TokenId) -> Result<(), TicketLedgerError> {
        if owner.is_zero() {
            return Err(TicketLedgerError::ZeroAddress);
        }
        if self.owners.contains_key(&token_id) {
            return Err(TicketLedgerError::AlreadyMinted(token_id));
        }
        self.owners.insert(token_id, *owner);
        Ok(())
    }

    fn burn(&mut self, token_id: TokenId) -> Result<(), TicketLedgerError> {
        self.owners
            .remove(&token_id)
            .map(|_| ())
            .ok_or(TicketLedgerError::NotFound(token_id))
    }

    fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.owners.get(&token_id).copied()
    }

    fn transfer(&mut self, from: &Address, to: &Address, token_id: TokenId) -> Result<(), TicketLedgerError> {
        if to.is_zero() {
            return Err(TicketLedgerError::ZeroAddress);
        }
        let owner = self
            .owners
            .get_mut(&token_id)
            .ok_or(TicketLedgerError::NotFound(token_id))?;
        if owner != from {
            return Err(TicketLedgerError::NotOwner {
                token_id,
                caller: *from,
            });
        }
        *owner = *to;
        Ok(())
    }

    fn balance_of(&self, owner: &Address) -> usize {
        self.owners.values().filter(|o| *o == owner).count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

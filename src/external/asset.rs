//! Fungible Value Asset
//!
//! The prize token. Purchases and seedings pull from the payer with
//! `transfer_from`; payouts and rescues push from the lottery's own account
//! with `transfer`. Any failure aborts the calling operation.

use std::collections::BTreeSet;

use thiserror::Error;

use super::Snapshot;
use crate::core::journal::JournaledMap;
use crate::game::state::{Address, Amount};

/// Token transfer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// An account holds less than the transfer.
    #[error("{account} holds {balance}, needs {needed}")]
    InsufficientBalance {
        /// Account being debited.
        account: Address,
        /// Its balance.
        balance: Amount,
        /// Amount requested.
        needed: Amount,
    },

    /// The payer approved less than the transfer.
    #[error("{owner} approved {allowance}, needs {needed}")]
    InsufficientAllowance {
        /// Payer.
        owner: Address,
        /// Allowance granted to the lottery.
        allowance: Amount,
        /// Amount requested.
        needed: Amount,
    },

    /// The recipient refused the transfer.
    #[error("transfer to {0} rejected")]
    Rejected(Address),
}

/// Fungible token consumed by the lottery.
///
/// `transfer` and `transfer_from` act on behalf of the lottery account the
/// asset instance was wired to.
pub trait ValueAsset: Snapshot {
    /// Balance of `account`.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Move `amount` from `from` to `to` using the lottery's allowance.
    fn transfer_from(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), AssetError>;

    /// Move `amount` out of the lottery's own balance.
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), AssetError>;
}

/// Map-backed token with allowances.
#[derive(Clone, Debug)]
pub struct InMemoryAsset {
    symbol: String,
    /// Account the lottery operates as.
    holder: Address,
    balances: JournaledMap<Address, Amount>,
    /// Allowance granted by each owner to `holder`.
    allowances: JournaledMap<Address, Amount>,
    blocked: BTreeSet<Address>,
}

impl InMemoryAsset {
    /// New token operated by `holder`.
    pub fn new(symbol: impl Into<String>, holder: Address) -> Self {
        Self {
            symbol: symbol.into(),
            holder,
            balances: JournaledMap::new(),
            allowances: JournaledMap::new(),
            blocked: BTreeSet::new(),
        }
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The account this instance transfers from.
    pub fn holder(&self) -> Address {
        self.holder
    }

    /// Create tokens out of thin air.
    pub fn mint(&mut self, to: &Address, amount: Amount) {
        let balance = self.balances.entry_or_default(*to);
        *balance = balance.saturating_add(amount);
    }

    /// Let the lottery pull up to `amount` from `owner`.
    pub fn approve(&mut self, owner: &Address, amount: Amount) {
        self.allowances.insert(*owner, amount);
    }

    /// Mint `amount` to `owner` and approve it in one go.
    pub fn fund(&mut self, owner: &Address, amount: Amount) {
        self.mint(owner, amount);
        let allowance = self.allowances.get(owner).copied().unwrap_or(0);
        self.approve(owner, allowance.saturating_add(amount));
    }

    /// Make every transfer to `account` fail.
    pub fn block(&mut self, account: &Address) {
        self.blocked.insert(*account);
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Amount {
        self.balances.values().sum()
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), AssetError> {
        if self.blocked.contains(to) {
            return Err(AssetError::Rejected(*to));
        }
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(AssetError::InsufficientBalance {
                account: *from,
                balance,
                needed: amount,
            });
        }
        self.balances.insert(*from, balance - amount);
        *self.balances.entry_or_default(*to) += amount;
        Ok(())
    }
}

impl Snapshot for InMemoryAsset {
    fn start_snapshot(&mut self) {
        self.balances.start_snapshot();
        self.allowances.start_snapshot();
    }

    fn end_snapshot(&mut self, keep: bool) {
        self.balances.end_snapshot(keep);
        self.allowances.end_snapshot(keep);
    }
}

impl ValueAsset for InMemoryAsset {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer_from(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), AssetError> {
        let allowance = self.allowances.get(from).copied().unwrap_or(0);
        if allowance < amount {
            return Err(AssetError::InsufficientAllowance {
                owner: *from,
                allowance,
                needed: amount,
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert(*from, allowance - amount);
        Ok(())
    }

    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), AssetError> {
        let holder = self.holder;
        self.move_balance(&holder, to, amount)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (InMemoryAsset, Address, Address) {
        let lottery = Address::from_label("lottery");
        let alice = Address::from_label("alice");
        (InMemoryAsset::new("PRIZE", lottery), lottery, alice)
    }

    #[test]
    fn test_transfer_from_uses_allowance() {
        let (mut asset, lottery, alice) = setup();
        asset.mint(&alice, 100);

        assert!(matches!(
            asset.transfer_from(&alice, &lottery, 10),
            Err(AssetError::InsufficientAllowance { allowance: 0, .. })
        ));

        asset.approve(&alice, 30);
        asset.transfer_from(&alice, &lottery, 10).unwrap();
        assert_eq!(asset.balance_of(&alice), 90);
        assert_eq!(asset.balance_of(&lottery), 10);

        assert!(asset.transfer_from(&alice, &lottery, 21).is_err());
        asset.transfer_from(&alice, &lottery, 20).unwrap();
    }

    #[test]
    fn test_transfer_from_holder() {
        let (mut asset, lottery, alice) = setup();
        asset.mint(&lottery, 5);

        assert!(matches!(
            asset.transfer(&alice, 6),
            Err(AssetError::InsufficientBalance { balance: 5, needed: 6, .. })
        ));
        asset.transfer(&alice, 5).unwrap();
        assert_eq!(asset.balance_of(&alice), 5);
        assert_eq!(asset.total_supply(), 5);
    }

    #[test]
    fn test_blocked_recipient() {
        let (mut asset, lottery, alice) = setup();
        asset.mint(&lottery, 5);
        asset.block(&alice);
        assert_eq!(asset.transfer(&alice, 1), Err(AssetError::Rejected(alice)));
        assert_eq!(asset.balance_of(&lottery), 5);
    }

    #[test]
    fn test_fund_accumulates_allowance() {
        let (mut asset, lottery, alice) = setup();
        asset.fund(&alice, 10);
        asset.fund(&alice, 10);
        asset.transfer_from(&alice, &lottery, 20).unwrap();
        assert_eq!(asset.balance_of(&lottery), 20);
    }

    #[test]
    fn test_snapshot_rollback() {
        let (mut asset, lottery, alice) = setup();
        asset.fund(&alice, 50);

        asset.start_snapshot();
        asset.transfer_from(&alice, &lottery, 20).unwrap();
        asset.transfer(&alice, 5).unwrap();
        asset.end_snapshot(false);

        assert_eq!(asset.balance_of(&alice), 50);
        assert_eq!(asset.balance_of(&lottery), 0);
        asset.transfer_from(&alice, &lottery, 50).unwrap();
    }
}

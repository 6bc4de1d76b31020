//! Jackpot Ledger
//!
//! The pooled money the lottery owes: the live jackpot, payouts reserved for
//! the previous round, and accrued community fees. The ledger only moves
//! numbers between buckets; policy checks (rate limits, minimums, state
//! gates) belong to the caller.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::StateHasher;
use crate::game::state::Amount;

/// Ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A claim asked for more than the unclaimed bucket holds.
    #[error("claim of {requested} exceeds unclaimed payouts of {available}")]
    InsufficientUnclaimedPayouts {
        /// Amount the claim would pay.
        requested: Amount,
        /// Current unclaimed payouts.
        available: Amount,
    },

    /// A credit would push the total owed past `Amount::MAX`.
    #[error("crediting {amount} overflows the {locked} already owed")]
    Overflow {
        /// Amount being credited.
        amount: Amount,
        /// Total owed before the credit.
        locked: Amount,
    },
}

/// Pool reallocation applied at one round boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollover {
    /// Whether the ended round had at least one winning ticket.
    pub had_winner: bool,
    /// Whether the ended round was the last one.
    pub is_terminal: bool,
    /// Live jackpot when the round ended.
    pub jackpot_before: Amount,
    /// Unclaimed payouts when the round ended (forfeited by stale tickets).
    pub unclaimed_before: Amount,
    /// Live jackpot carried into the next round.
    pub jackpot_after: Amount,
    /// Reserved for the ended round's claimants.
    pub unclaimed_after: Amount,
}

impl Rollover {
    /// Money in both buckets before the transition, `None` on overflow.
    pub fn total_before(&self) -> Option<Amount> {
        self.jackpot_before.checked_add(self.unclaimed_before)
    }

    /// Money in both buckets after the transition, `None` on overflow.
    pub fn total_after(&self) -> Option<Amount> {
        self.jackpot_after.checked_add(self.unclaimed_after)
    }

    /// Check the record against the rollover table.
    ///
    /// Records whose sums overflow are inconsistent; the ledger never
    /// produces one.
    pub fn is_consistent(&self) -> bool {
        let (Some(total), Some(after)) = (self.total_before(), self.total_after()) else {
            return false;
        };
        if after != total {
            return false;
        }
        if self.had_winner || self.is_terminal {
            self.jackpot_after == 0 && self.unclaimed_after == total
        } else {
            self.jackpot_after == total && self.unclaimed_after == 0
        }
    }

    /// Hash for state verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_bool(self.had_winner);
        hasher.update_bool(self.is_terminal);
        hasher.update_u128(self.jackpot_before);
        hasher.update_u128(self.unclaimed_before);
        hasher.update_u128(self.jackpot_after);
        hasher.update_u128(self.unclaimed_after);
    }
}

/// The three accounting buckets.
///
/// Credits are checked against the sum of all three, so adding buckets
/// together never overflows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotLedger {
    jackpot: Amount,
    unclaimed_payouts: Amount,
    accrued_community_fees: Amount,
}

impl JackpotLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live jackpot.
    pub fn jackpot(&self) -> Amount {
        self.jackpot
    }

    /// Reserved for the previous round's claimants.
    pub fn unclaimed_payouts(&self) -> Amount {
        self.unclaimed_payouts
    }

    /// Community fees held internally.
    pub fn accrued_community_fees(&self) -> Amount {
        self.accrued_community_fees
    }

    /// Everything the lottery owes.
    pub fn locked(&self) -> Amount {
        self.jackpot
            .saturating_add(self.unclaimed_payouts)
            .saturating_add(self.accrued_community_fees)
    }

    fn ensure_room(&self, amount: Amount) -> Result<(), LedgerError> {
        let locked = self.locked();
        let room = self
            .jackpot
            .checked_add(self.unclaimed_payouts)
            .and_then(|sum| sum.checked_add(self.accrued_community_fees))
            .and_then(|sum| sum.checked_add(amount));
        match room {
            Some(_) => Ok(()),
            None => Err(LedgerError::Overflow { amount, locked }),
        }
    }

    /// Add the jackpot share of a purchase.
    pub fn credit(&mut self, jackpot_share: Amount) -> Result<(), LedgerError> {
        self.ensure_room(jackpot_share)?;
        self.jackpot += jackpot_share;
        Ok(())
    }

    /// Accrue community fees.
    pub fn credit_fees(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.ensure_room(amount)?;
        self.accrued_community_fees += amount;
        Ok(())
    }

    /// Add a seeding to the jackpot.
    pub fn seed(&mut self, value: Amount) -> Result<(), LedgerError> {
        self.credit(value)
    }

    /// Pay a claim out of the unclaimed bucket.
    pub fn debit_for_claim(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount > self.unclaimed_payouts {
            return Err(LedgerError::InsufficientUnclaimedPayouts {
                requested: amount,
                available: self.unclaimed_payouts,
            });
        }
        self.unclaimed_payouts -= amount;
        Ok(())
    }

    /// Zero the accrued fees, returning what was there.
    pub fn withdraw_fees(&mut self) -> Amount {
        std::mem::take(&mut self.accrued_community_fees)
    }

    /// Reallocate the pools at a round boundary.
    ///
    /// | had_winner | is_terminal | jackpot | unclaimed |
    /// |---|---|---|---|
    /// | false | false | sum | 0 |
    /// | false | true  | 0 | sum |
    /// | true  | any   | 0 | sum |
    pub fn rollover(&mut self, had_winner: bool, is_terminal: bool) -> Rollover {
        let jackpot_before = self.jackpot;
        let unclaimed_before = self.unclaimed_payouts;
        // Credits keep the bucket sum in range; saturation only guards
        // deserialized ledgers.
        let total = jackpot_before.saturating_add(unclaimed_before);

        if had_winner || is_terminal {
            self.jackpot = 0;
            self.unclaimed_payouts = total;
        } else {
            self.jackpot = total;
            self.unclaimed_payouts = 0;
        }

        let record = Rollover {
            had_winner,
            is_terminal,
            jackpot_before,
            unclaimed_before,
            jackpot_after: self.jackpot,
            unclaimed_after: self.unclaimed_payouts,
        };

        debug_assert!(record.is_consistent(), "rollover must conserve pooled money");
        record
    }

    /// Release every bucket. Only valid once nothing can be owed any more.
    pub fn clear(&mut self) -> Amount {
        let total = self.locked();
        *self = Self::default();
        total
    }

    /// Hash for state verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u128(self.jackpot);
        hasher.update_u128(self.unclaimed_payouts);
        hasher.update_u128(self.accrued_community_fees);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ledger(jackpot: Amount, unclaimed: Amount) -> JackpotLedger {
        JackpotLedger {
            jackpot,
            unclaimed_payouts: unclaimed,
            accrued_community_fees: 0,
        }
    }

    #[test]
    fn test_no_winner_folds_into_jackpot() {
        let mut l = ledger(100, 40);
        let r = l.rollover(false, false);
        assert_eq!(l.jackpot(), 140);
        assert_eq!(l.unclaimed_payouts(), 0);
        assert!(r.is_consistent());
    }

    #[test]
    fn test_terminal_no_winner_moves_to_unclaimed() {
        let mut l = ledger(100, 40);
        let r = l.rollover(false, true);
        assert_eq!(l.jackpot(), 0);
        assert_eq!(l.unclaimed_payouts(), 140);
        assert!(r.is_consistent());
    }

    #[test]
    fn test_winner_moves_to_unclaimed() {
        for terminal in [false, true] {
            let mut l = ledger(100, 40);
            let r = l.rollover(true, terminal);
            assert_eq!(l.jackpot(), 0);
            assert_eq!(l.unclaimed_payouts(), 140);
            assert!(r.is_consistent());
        }
    }

    #[test]
    fn test_debit_for_claim() {
        let mut l = ledger(0, 50);
        assert!(l.debit_for_claim(20).is_ok());
        assert_eq!(l.unclaimed_payouts(), 30);
        assert_eq!(
            l.debit_for_claim(31),
            Err(LedgerError::InsufficientUnclaimedPayouts { requested: 31, available: 30 })
        );
        assert_eq!(l.unclaimed_payouts(), 30);
    }

    #[test]
    fn test_fees() {
        let mut l = JackpotLedger::new();
        l.credit_fees(7).unwrap();
        l.credit_fees(3).unwrap();
        assert_eq!(l.accrued_community_fees(), 10);
        assert_eq!(l.withdraw_fees(), 10);
        assert_eq!(l.withdraw_fees(), 0);
    }

    #[test]
    fn test_clear() {
        let mut l = ledger(5, 6);
        l.credit_fees(7).unwrap();
        assert_eq!(l.locked(), 18);
        assert_eq!(l.clear(), 18);
        assert_eq!(l, JackpotLedger::new());
    }

    #[test]
    fn test_credit_overflow_is_an_error() {
        let mut l = ledger(Amount::MAX - 10, 5);
        assert_eq!(
            l.credit(6),
            Err(LedgerError::Overflow { amount: 6, locked: Amount::MAX - 5 })
        );
        assert_eq!(l.credit_fees(6), Err(LedgerError::Overflow { amount: 6, locked: Amount::MAX - 5 }));
        assert!(l.seed(Amount::MAX).is_err());
        assert_eq!(l.jackpot(), Amount::MAX - 10);

        l.credit(5).unwrap();
        assert_eq!(l.locked(), Amount::MAX);
        let r = l.rollover(false, false);
        assert_eq!(r.total_after(), Some(Amount::MAX));
    }

    #[test]
    fn test_overflowing_record_is_inconsistent() {
        let r = Rollover {
            had_winner: true,
            is_terminal: false,
            jackpot_before: Amount::MAX,
            unclaimed_before: 1,
            jackpot_after: 0,
            unclaimed_after: 0,
        };
        assert_eq!(r.total_before(), None);
        assert!(!r.is_consistent());
    }

    #[test]
    fn test_inconsistent_record_detected() {
        let r = Rollover {
            had_winner: false,
            is_terminal: false,
            jackpot_before: 10,
            unclaimed_before: 0,
            jackpot_after: 0,
            unclaimed_after: 10,
        };
        assert!(!r.is_consistent());
    }

    proptest! {
        #[test]
        fn prop_rollover_conserves(
            jackpot in 0u128..u64::MAX as u128,
            unclaimed in 0u128..u64::MAX as u128,
            had_winner: bool,
            is_terminal: bool,
        ) {
            let mut l = ledger(jackpot, unclaimed);
            let r = l.rollover(had_winner, is_terminal);
            prop_assert_eq!(r.total_before(), r.total_after());
            prop_assert!(r.is_consistent());
        }
    }
}

//! In-memory token ledger
//!
//! Balance map backing the reserve and player accounts in tests, the
//! simulator and the execution service.

use crate::common::{traits::TokenLedger, types::Address};
use crate::errors::LedgerError;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, u64>,
    total_supply: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Number of accounts that have ever been credited
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *from,
                available,
                required: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(*to))?;

        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }

    fn deposit(&mut self, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(*to))?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(*to))?;

        self.balances.insert(*to, credited);
        self.total_supply = supply;
        Ok(())
    }

    fn withdraw(&mut self, from: &Address, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *from,
                available,
                required: amount,
            });
        }

        self.balances.insert(*from, available - amount);
        self.total_supply -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_and_transfer() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut ledger = InMemoryLedger::new();

        ledger.deposit(&alice, 500).unwrap();
        ledger.transfer(&alice, &bob, 200).unwrap();

        assert_eq!(ledger.balance_of(&alice), 300);
        assert_eq!(ledger.balance_of(&bob), 200);
        assert_eq!(ledger.total_supply(), 500);
    }

    #[test]
    fn test_transfer_is_all_or_nothing() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut ledger = InMemoryLedger::new();
        ledger.deposit(&alice, 199).unwrap();

        let err = ledger.transfer(&alice, &bob, 200).unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: alice,
                available: 199,
                required: 200,
            }
        );
        assert_eq!(ledger.balance_of(&alice), 199);
        assert_eq!(ledger.balance_of(&bob), 0);
    }

    #[test]
    fn test_withdraw_reduces_supply() {
        let alice = Address::from_label("alice");
        let mut ledger = InMemoryLedger::new();
        ledger.deposit(&alice, 50).unwrap();

        ledger.withdraw(&alice, 20).unwrap();
        assert_eq!(ledger.balance_of(&alice), 30);
        assert_eq!(ledger.total_supply(), 30);
        assert!(ledger.withdraw(&alice, 31).is_err());
    }

    #[test]
    fn test_deposit_overflow_is_rejected() {
        let alice = Address::from_label("alice");
        let mut ledger = InMemoryLedger::new();
        ledger.deposit(&alice, u64::MAX).unwrap();

        assert_eq!(
            ledger.deposit(&alice, 1),
            Err(LedgerError::BalanceOverflow(alice))
        );
        assert_eq!(ledger.balance_of(&alice), u64::MAX);
    }
}

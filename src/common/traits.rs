//! Shared traits and interfaces
//!
//! The engine is written against these two seams only: where entropy comes
//! from and where value is held.

use crate::common::types::{Address, CallContext};
use crate::errors::LedgerError;

/// Source of entropy consumed by a draw.
///
/// `ctx` carries the settlement step of the call; providers that ignore it
/// are free to.
pub trait RandomProvider: Send + Sync {
    fn draw(&self, ctx: &CallContext) -> u64;
}

/// Value-transfer interface for the fungible unit that funds the reserve.
pub trait TokenLedger: Send {
    /// Current balance of `account`; unknown accounts hold zero
    fn balance_of(&self, account: &Address) -> u64;

    /// Move `amount` from `from` to `to`, all or nothing
    fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Credit `amount` to `to` from outside the ledger
    fn deposit(&mut self, to: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Debit `amount` from `from` out of the ledger
    fn withdraw(&mut self, from: &Address, amount: u64) -> Result<(), LedgerError>;
}

//! Access gate: a single owner, a single blacklister and the blacklist.
//!
//! The owner holds configuration authority. The blacklister holds compliance
//! authority over the blacklist. Any account may put itself on the blacklist.

use crate::common::types::Address;
use crate::errors::{AccessError, SpinResult};
use crate::events::{MachineEvent, Receipt, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    blacklister: Address,
    blacklist: HashSet<Address>,
}

impl AccessControl {
    /// Gate owned by `owner`, who is also the initial blacklister
    pub fn new(owner: Address) -> SpinResult<Self> {
        if owner.is_zero() {
            return Err(AccessError::InvalidAddress("owner").into());
        }

        Ok(Self {
            owner,
            blacklister: owner,
            blacklist: HashSet::new(),
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn blacklister(&self) -> Address {
        self.blacklister
    }

    pub fn is_blacklisted(&self, account: &Address) -> bool {
        self.blacklist.contains(account)
    }

    pub fn blacklisted_count(&self) -> usize {
        self.blacklist.len()
    }

    pub fn require_owner(&self, caller: &Address) -> SpinResult<()> {
        if *caller != self.owner {
            tracing::warn!(%caller, "rejected: caller is not the owner");
            return Err(AccessError::Unauthorized {
                caller: *caller,
                role: "owner",
            }
            .into());
        }
        Ok(())
    }

    pub fn require_blacklister(&self, caller: &Address) -> SpinResult<()> {
        if *caller != self.blacklister {
            tracing::warn!(%caller, "rejected: caller is not the blacklister");
            return Err(AccessError::Unauthorized {
                caller: *caller,
                role: "blacklister",
            }
            .into());
        }
        Ok(())
    }

    pub fn require_not_blacklisted(&self, caller: &Address) -> SpinResult<()> {
        if self.is_blacklisted(caller) {
            tracing::warn!(%caller, "rejected: account is blacklisted");
            return Err(AccessError::AccountBlocked(*caller).into());
        }
        Ok(())
    }

    /// Hand ownership to `new_owner`. Owner only.
    pub fn set_owner(&mut self, caller: &Address, new_owner: Address) -> SpinResult<Receipt> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(AccessError::InvalidAddress("owner").into());
        }

        self.owner = new_owner;
        tracing::info!(owner = %new_owner, "owner changed");
        Ok(Receipt::single(MachineEvent::RoleChanged {
            role: Role::Owner,
            account: new_owner,
        }))
    }

    /// Replace the blacklister. Owner only.
    pub fn set_blacklister(&mut self, caller: &Address, new_blacklister: Address) -> SpinResult<Receipt> {
        self.require_owner(caller)?;
        if new_blacklister.is_zero() {
            return Err(AccessError::InvalidAddress("blacklister").into());
        }

        self.blacklister = new_blacklister;
        tracing::info!(blacklister = %new_blacklister, "blacklister changed");
        Ok(Receipt::single(MachineEvent::RoleChanged {
            role: Role::Blacklister,
            account: new_blacklister,
        }))
    }

    /// Blacklister only; listing an already listed account succeeds again.
    pub fn add_to_blacklist(&mut self, caller: &Address, account: Address) -> SpinResult<Receipt> {
        self.require_blacklister(caller)?;

        self.blacklist.insert(account);
        tracing::info!(%account, "account blacklisted");
        Ok(Receipt::single(MachineEvent::BlacklistChanged {
            account,
            listed: true,
        }))
    }

    /// Blacklister only; removing an absent account succeeds again.
    pub fn remove_from_blacklist(&mut self, caller: &Address, account: Address) -> SpinResult<Receipt> {
        self.require_blacklister(caller)?;

        self.blacklist.remove(&account);
        tracing::info!(%account, "account removed from blacklist");
        Ok(Receipt::single(MachineEvent::BlacklistChanged {
            account,
            listed: false,
        }))
    }

    /// Any caller may list itself. Never fails.
    pub fn self_blacklist(&mut self, caller: &Address) -> Receipt {
        self.blacklist.insert(*caller);
        tracing::info!(account = %caller, "account blacklisted itself");
        Receipt {
            events: vec![
                MachineEvent::BlacklistChanged {
                    account: *caller,
                    listed: true,
                },
                MachineEvent::SelfBlacklisted { account: *caller },
            ],
        }
    }
}

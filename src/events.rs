//! Notifications emitted by machine operations
//!
//! A successful operation hands its notifications back in a [`Receipt`]. An
//! ineligible draw succeeds with an empty receipt.

use crate::common::types::Address;
use crate::machine::randomness::RandomnessKind;
use serde::{Deserialize, Serialize};

/// Administrative role carried by a [`MachineEvent::RoleChanged`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Blacklister,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MachineEvent {
    PrizesChanged {
        prizes: Vec<u64>,
    },
    CooldownChanged {
        new: u64,
        old: u64,
    },
    PriceChanged {
        new: u64,
        old: u64,
    },
    CreditsGranted {
        granter: Address,
        recipient: Address,
        count: u64,
    },
    CreditsPurchased {
        buyer: Address,
        recipient: Address,
        count: u64,
    },
    /// `nominal` is the drawn prize, `sent` what the reserve could cover
    Drawn {
        account: Address,
        nominal: u64,
        sent: u64,
        used_credit: bool,
    },
    RoleChanged {
        role: Role,
        account: Address,
    },
    BlacklistChanged {
        account: Address,
        listed: bool,
    },
    SelfBlacklisted {
        account: Address,
    },
    RandomProviderChanged {
        kind: RandomnessKind,
    },
    RandomValueChanged {
        value: u64,
    },
}

/// Settled draw as carried by [`MachineEvent::Drawn`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawRecord {
    pub account: Address,
    pub nominal: u64,
    pub sent: u64,
    pub used_credit: bool,
}

impl DrawRecord {
    /// Portion of the nominal prize the reserve could not cover
    pub fn shortfall(&self) -> u64 {
        self.nominal - self.sent
    }
}

/// Notifications produced by one successful operation, in emission order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub events: Vec<MachineEvent>,
}

impl Receipt {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(event: MachineEvent) -> Self {
        Self {
            events: vec![event],
        }
    }

    pub fn push(&mut self, event: MachineEvent) {
        self.events.push(event);
    }

    /// True when the operation completed without any effect
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }

    /// The settled draw, if this receipt belongs to one
    pub fn drawn(&self) -> Option<DrawRecord> {
        self.events.iter().find_map(|event| match *event {
            MachineEvent::Drawn {
                account,
                nominal,
                sent,
                used_credit,
            } => Some(DrawRecord {
                account,
                nominal,
                sent,
                used_credit,
            }),
            _ => None,
        })
    }
}

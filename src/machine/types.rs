//! Machine state records

use serde::{Deserialize, Serialize};

/// Owner-mutable settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Drawn uniformly by index; empty means no prizes configured
    pub prizes: Vec<u64>,
    /// Seconds between free draws
    pub free_spin_delay: u64,
    /// Cost of one purchased credit
    pub extra_spin_price: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prizes: Vec::new(),
            free_spin_delay: crate::config::DEFAULT_FREE_SPIN_DELAY_SECS,
            extra_spin_price: 0,
        }
    }
}

/// Per-account draw state. Created on first reference, never removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Timestamp of the last free draw, 0 if never
    pub last_free_spin: u64,
    /// Purchased or granted credits not yet consumed
    pub extra_spins: u64,
}

impl AccountState {
    pub fn can_free_spin(&self, now: u64, free_spin_delay: u64) -> bool {
        self.last_free_spin == 0 || now.saturating_sub(self.last_free_spin) >= free_spin_delay
    }

    /// Free eligibility wins over credits
    pub fn eligibility(&self, now: u64, free_spin_delay: u64) -> Eligibility {
        if self.can_free_spin(now, free_spin_delay) {
            Eligibility::Free
        } else if self.extra_spins > 0 {
            Eligibility::Credit
        } else {
            Eligibility::Ineligible
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Free,
    Credit,
    Ineligible,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        !matches!(self, Eligibility::Ineligible)
    }
}

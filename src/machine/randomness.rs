//! Randomness providers
//!
//! Two variants behind one capability:
//!
//! - [`BlockEntropyProvider`] hashes the settlement step of the call. Calls in
//!   the same step see the same value, calls in different steps almost surely
//!   differ. Whoever orders operations within a step can predict it, so it is
//!   only meant for low-stakes draws.
//! - [`OperatorRandomProvider`] returns whatever its operator last stored,
//!   zero until first set. Unpredictability is entirely up to the operator
//!   feeding it before each round of draws.

use crate::common::{
    traits::RandomProvider,
    types::{Address, CallContext},
};
use crate::errors::{AccessError, RandomnessError, SpinResult};
use crate::events::{MachineEvent, Receipt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const IN_BAND_DOMAIN: &[u8] = b"spin-machine:in-band";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RandomnessKind {
    InBand,
    OutOfBand,
}

impl fmt::Display for RandomnessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RandomnessKind::InBand => write!(f, "in_band"),
            RandomnessKind::OutOfBand => write!(f, "out_of_band"),
        }
    }
}

/// Stateless provider derived from the settlement step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockEntropyProvider;

impl BlockEntropyProvider {
    pub fn new() -> Self {
        Self
    }
}

impl RandomProvider for BlockEntropyProvider {
    fn draw(&self, ctx: &CallContext) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(IN_BAND_DOMAIN);
        hasher.update(ctx.block_height.to_be_bytes());
        hasher.update(ctx.timestamp.to_be_bytes());
        let digest = hasher.finalize();

        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(word)
    }
}

/// Provider holding an operator-supplied value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorRandomProvider {
    operator: Address,
    current_value: u64,
}

impl OperatorRandomProvider {
    pub fn new(operator: Address) -> Self {
        Self::with_value(operator, 0)
    }

    pub fn with_value(operator: Address, current_value: u64) -> Self {
        Self {
            operator,
            current_value,
        }
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn current_value(&self) -> u64 {
        self.current_value
    }

    /// Overwrite the held value. Operator only.
    pub fn set_value(&mut self, caller: &Address, value: u64) -> SpinResult<Receipt> {
        if *caller != self.operator {
            tracing::warn!(%caller, "rejected: caller is not the randomness operator");
            return Err(AccessError::Unauthorized {
                caller: *caller,
                role: "randomness operator",
            }
            .into());
        }

        self.current_value = value;
        tracing::debug!("operator random value updated");
        Ok(Receipt::single(MachineEvent::RandomValueChanged { value }))
    }
}

impl RandomProvider for OperatorRandomProvider {
    fn draw(&self, _ctx: &CallContext) -> u64 {
        self.current_value
    }
}

/// Provider installed in a machine, selected at configuration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RandomnessSource {
    InBand(BlockEntropyProvider),
    OutOfBand(OperatorRandomProvider),
}

impl RandomnessSource {
    pub fn in_band() -> Self {
        RandomnessSource::InBand(BlockEntropyProvider::new())
    }

    pub fn out_of_band(operator: Address, initial_value: u64) -> Self {
        RandomnessSource::OutOfBand(OperatorRandomProvider::with_value(operator, initial_value))
    }

    pub fn kind(&self) -> RandomnessKind {
        match self {
            RandomnessSource::InBand(_) => RandomnessKind::InBand,
            RandomnessSource::OutOfBand(_) => RandomnessKind::OutOfBand,
        }
    }

    /// Feed a new value to the out-of-band variant
    pub fn set_value(&mut self, caller: &Address, value: u64) -> SpinResult<Receipt> {
        match self {
            RandomnessSource::OutOfBand(provider) => provider.set_value(caller, value),
            RandomnessSource::InBand(_) => Err(RandomnessError::NotOperatorFed.into()),
        }
    }
}

impl RandomProvider for RandomnessSource {
    fn draw(&self, ctx: &CallContext) -> u64 {
        match self {
            RandomnessSource::InBand(provider) => provider.draw(ctx),
            RandomnessSource::OutOfBand(provider) => provider.draw(ctx),
        }
    }
}

//! Shared type definitions for the spin machine
//!
//! Canonical account identity and the per-call host context used throughout
//! the crate.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte account identity. The all-zero value is the null identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The null identity
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a stable address from a human-readable label
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"spin-machine:address:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a `0x`-prefixed or bare 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Host context of a single operation.
///
/// `timestamp` is in seconds. Calls sharing `block_height` and `timestamp`
/// belong to the same settlement step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub block_height: u64,
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, block_height: u64, timestamp: u64) -> Self {
        Self {
            caller,
            block_height,
            timestamp,
        }
    }

    /// Same settlement step, different caller
    pub fn with_caller(&self, caller: Address) -> Self {
        Self { caller, ..*self }
    }
}

//! Error types for the spin machine
//!
//! Every error aborts the operation that raised it. Nothing is written and no
//! notification is emitted before an error is returned.

use std::fmt;

use crate::common::types::Address;

/// Root error type for all spin machine operations
#[derive(Debug)]
pub enum SpinError {
    /// Authorization and blacklist failures
    Access(AccessError),

    /// Value-transfer failures against the ledger
    Ledger(LedgerError),

    /// Draw and credit bookkeeping failures
    Draw(DrawError),

    /// Randomness provider failures
    Randomness(RandomnessError),

    /// Configuration loading and validation errors
    Configuration(ConfigurationError),

    /// Serialized execution service errors
    Service(ServiceError),
}

/// Access gate failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("caller {caller} lacks the {role} role")]
    Unauthorized { caller: Address, role: &'static str },

    #[error("account {0} is blacklisted")]
    AccountBlocked(Address),

    #[error("the zero address cannot hold the {0} role")]
    InvalidAddress(&'static str),
}

/// Ledger failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds: {account} holds {available}, needs {required}")]
    InsufficientFunds {
        account: Address,
        available: u64,
        required: u64,
    },

    #[error("balance of {0} would overflow")]
    BalanceOverflow(Address),
}

/// Draw and credit failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    #[error("no prizes configured")]
    NoPrizesConfigured,

    #[error("credit balance of {0} would overflow")]
    CreditOverflow(Address),
}

/// Randomness provider failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RandomnessError {
    #[error("the installed randomness provider is not operator-fed")]
    NotOperatorFed,
}

/// Configuration and validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Execution service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("machine service is no longer running")]
    Unavailable,
}

impl fmt::Display for SpinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinError::Access(e) => write!(f, "Access error: {}", e),
            SpinError::Ledger(e) => write!(f, "Ledger error: {}", e),
            SpinError::Draw(e) => write!(f, "Draw error: {}", e),
            SpinError::Randomness(e) => write!(f, "Randomness error: {}", e),
            SpinError::Configuration(e) => write!(f, "Configuration error: {}", e),
            SpinError::Service(e) => write!(f, "Service error: {}", e),
        }
    }
}

impl std::error::Error for SpinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpinError::Access(e) => Some(e),
            SpinError::Ledger(e) => Some(e),
            SpinError::Draw(e) => Some(e),
            SpinError::Randomness(e) => Some(e),
            SpinError::Configuration(e) => Some(e),
            SpinError::Service(e) => Some(e),
        }
    }
}

impl From<AccessError> for SpinError {
    fn from(e: AccessError) -> Self {
        SpinError::Access(e)
    }
}

impl From<LedgerError> for SpinError {
    fn from(e: LedgerError) -> Self {
        SpinError::Ledger(e)
    }
}

impl From<DrawError> for SpinError {
    fn from(e: DrawError) -> Self {
        SpinError::Draw(e)
    }
}

impl From<RandomnessError> for SpinError {
    fn from(e: RandomnessError) -> Self {
        SpinError::Randomness(e)
    }
}

impl From<ConfigurationError> for SpinError {
    fn from(e: ConfigurationError) -> Self {
        SpinError::Configuration(e)
    }
}

impl From<ServiceError> for SpinError {
    fn from(e: ServiceError) -> Self {
        SpinError::Service(e)
    }
}

impl From<std::io::Error> for SpinError {
    fn from(e: std::io::Error) -> Self {
        SpinError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for SpinError {
    fn from(e: serde_json::Error) -> Self {
        SpinError::Configuration(ConfigurationError::SaveFailed(e.to_string()))
    }
}

impl SpinError {
    /// True for the blacklist rejection raised by the draw and purchase paths.
    pub fn is_account_blocked(&self) -> bool {
        matches!(self, SpinError::Access(AccessError::AccountBlocked(_)))
    }

    /// True when the caller lacked the role an administrative path requires.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SpinError::Access(AccessError::Unauthorized { .. }))
    }
}

// Convenience type alias for Results
pub type SpinResult<T> = Result<T, SpinError>;

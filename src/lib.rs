//! Spin Machine - resource-gated reward engine
//!
//! Accounts draw a prize from a configured table, either for free once a
//! cooldown has elapsed or by consuming a purchased credit. Prizes are paid
//! from a reserve held on a token ledger, never beyond what the reserve holds.
//! An owner configures the machine, a blacklister blocks accounts, and a
//! pluggable provider supplies the entropy for each draw.
//!
//! Every operation takes a [`CallContext`] (caller, block height, timestamp)
//! and either returns a [`Receipt`] of the notifications it emitted or an
//! error having changed nothing. An account with nothing to play with gets an
//! empty receipt from [`SpinMachine::draw`], not an error.

pub mod common;
pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod machine;
pub mod metrics;
pub mod service;

pub use common::{
    traits::{RandomProvider, TokenLedger},
    types::{Address, CallContext},
};
pub use config::{ConfigBuilder, ConfigLoader, MachineConfig, RandomnessMode};
pub use errors::{SpinError, SpinResult};
pub use events::{DrawRecord, MachineEvent, Receipt, Role};
pub use ledger::InMemoryLedger;
pub use machine::{
    AccountState, BlockEntropyProvider, Eligibility, OperatorRandomProvider, RandomnessKind, RandomnessSource,
    Settings, SpinMachine,
};
pub use metrics::{MachineMetrics, MetricsSnapshot};
pub use service::{MachineHandle, MachineService};

pub mod access;
pub mod engine;
pub mod randomness;
pub mod types;

pub use access::AccessControl;
pub use engine::SpinMachine;
pub use randomness::{BlockEntropyProvider, OperatorRandomProvider, RandomnessKind, RandomnessSource};
pub use types::{AccountState, Eligibility, Settings};

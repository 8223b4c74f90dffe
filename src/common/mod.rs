//! Common utilities and shared functionality
//!
//! Identity and host-context types plus the traits the engine is written against.

pub mod types;
pub mod traits;

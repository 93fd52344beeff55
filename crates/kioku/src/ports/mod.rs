//! Ports (Interfaces)
//!
//! Abstract interfaces that define how the decision core talks to the
//! model backends plugged in around it.
//!
//! Implementations of these traits live outside this crate.

pub mod services;

// Re-exports
pub use services::*;

//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod conflict_type;
mod context;
mod decision_source;
mod forgetting_strategy;
mod importance;
mod memory_type;
mod prune_strategy;
mod resolution_strategy;

pub use conflict_type::*;
pub use context::*;
pub use decision_source::*;
pub use forgetting_strategy::*;
pub use importance::*;
pub use memory_type::*;
pub use prune_strategy::*;
pub use resolution_strategy::*;

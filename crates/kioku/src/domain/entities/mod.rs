//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - MemoryRecord: the unit every component works on
//! - Conflict / Resolution: transient results of conflict detection
//! - ForgettingPolicy: configuration value overriding per-type defaults
//! - MemoryPatch: an explicit mutation for the owning store to apply

mod conflict;
mod memory;
mod patch;
mod policy;

pub use conflict::*;
pub use memory::*;
pub use patch::*;
pub use policy::*;

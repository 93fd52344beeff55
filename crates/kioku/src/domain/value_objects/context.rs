//! MemoryContext - caller-supplied hints

use std::collections::BTreeMap;

/// Free-form key/value hints passed alongside a record
/// (e.g. `priority = "high"`, `source = "user"`, `category = "health"`).
///
/// Ordered so that prompts built from it are stable.
pub type MemoryContext = BTreeMap<String, String>;

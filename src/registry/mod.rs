//! Account registry
//!
//! Creates accounts, indexes them in creation order, and re-broadcasts
//! ownership facts for off-system observers. The dependency only runs one
//! way: the registry calls into accounts, accounts never call the registry.

pub mod manager;

pub use manager::{AccountSummary, Registry, RegistryError};

//! Data file loaders for the loadout catalog and configuration.
//!
//! Converts RON/TOML data files into the read-only values the runtime
//! injects at construction: the item catalog and the inventory config.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{CatalogLoader, ConfigLoader};

//! Inventory configuration loader.

use std::path::Path;

use loadout_core::InventoryConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for inventory configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Missing fields fall back to the compiled defaults, so a partial file
    /// (or an empty one) is valid.
    pub fn load(path: &Path) -> LoadResult<InventoryConfig> {
        let content = read_file(path)?;
        let config: InventoryConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }
}

//! Item catalog loader.

use std::path::Path;

use loadout_core::{AffixDefinition, ItemCatalog, ItemDefinition};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Catalog file structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub items: Vec<ItemDefinition>,
    #[serde(default)]
    pub affixes: Vec<AffixDefinition>,
}

/// Loader for the item catalog from RON files.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load an item catalog from a RON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the RON file containing a CatalogFile
    ///
    /// # Returns
    ///
    /// Returns a ready-to-inject ItemCatalog.
    pub fn load(path: &Path) -> LoadResult<ItemCatalog> {
        let content = read_file(path)?;
        let file: CatalogFile = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog RON: {}", e))?;

        Ok(ItemCatalog::new(file.items, file.affixes))
    }
}

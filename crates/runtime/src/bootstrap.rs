//! Convenience bootstrap: data files in, running service out.
//!
//! Hosts that keep their catalog and settings in data files can start a
//! service in one call instead of wiring loaders, repository, and service
//! by hand.

use std::path::Path;
use std::sync::Arc;

use loadout_content::{CatalogLoader, ConfigLoader};
use loadout_core::{DropHandler, InventoryConfig, ItemCatalog, OwnerId};

use crate::repository::FileSnapshotRepository;
use crate::service::{InventoryService, ServiceError};

/// Errors raised while bootstrapping from data files.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("content load failed: {0}")]
    Content(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Loads the catalog (RON) and optional config (TOML), opens a file
/// repository under `save_dir`, and starts the owner's service.
pub async fn start_from_files<D>(
    catalog_path: &Path,
    config_path: Option<&Path>,
    save_dir: &Path,
    owner: OwnerId,
    dropper: D,
) -> Result<InventoryService<ItemCatalog, D>, BootstrapError>
where
    D: DropHandler,
{
    let catalog = CatalogLoader::load(catalog_path)
        .map_err(|e| BootstrapError::Content(e.to_string()))?;
    let config = match config_path {
        Some(path) => {
            ConfigLoader::load(path).map_err(|e| BootstrapError::Content(e.to_string()))?
        }
        None => InventoryConfig::default(),
    };

    let repository = FileSnapshotRepository::new(save_dir).map_err(ServiceError::Repository)?;

    let service = InventoryService::start(
        Arc::new(catalog),
        dropper,
        owner,
        config,
        Box::new(repository),
    )
    .await?;
    Ok(service)
}

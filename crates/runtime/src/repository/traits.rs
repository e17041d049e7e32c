//! Storage abstraction for inventory snapshots.

use std::path::PathBuf;

use loadout_core::{InventorySnapshot, OwnerId};

use super::error::Result;

/// Outcome of loading one owner's persisted state.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// A valid snapshot was read (possibly after structural repair).
    Snapshot(InventorySnapshot),

    /// Nothing persisted for this owner yet.
    Missing,

    /// The payload was unrecoverable; it was preserved at `backup` and the
    /// caller should start from a fresh empty state.
    Recovered { backup: PathBuf },
}

/// Storage for one JSON snapshot document per owner.
pub trait SnapshotRepository: Send {
    /// Persists the snapshot, returning the hex digest of the stored body.
    fn save(&self, snapshot: &InventorySnapshot) -> Result<String>;

    fn load(&self, owner: OwnerId) -> Result<LoadOutcome>;

    fn exists(&self, owner: OwnerId) -> bool;

    fn delete(&self, owner: OwnerId) -> Result<()>;
}

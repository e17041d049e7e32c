//! In-memory SnapshotRepository implementation for tests and tooling.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use loadout_core::{InventorySnapshot, OwnerId};

use super::error::{RepositoryError, Result};
use super::file::digest_of;
use super::traits::{LoadOutcome, SnapshotRepository};

/// Memory-backed implementation of [`SnapshotRepository`].
///
/// Counts saves so tests can assert debounce coalescing without touching the
/// filesystem.
#[derive(Default)]
pub struct MemorySnapshotRepository {
    snapshots: Mutex<HashMap<OwnerId, InventorySnapshot>>,
    saves: AtomicUsize,
}

impl MemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed save calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotRepository for MemorySnapshotRepository {
    fn save(&self, snapshot: &InventorySnapshot) -> Result<String> {
        let body =
            serde_json::to_value(snapshot).map_err(|e| RepositoryError::Json(e.to_string()))?;
        let digest = digest_of(&body)?;

        self.snapshots
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?
            .insert(snapshot.owner, snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(digest)
    }

    fn load(&self, owner: OwnerId) -> Result<LoadOutcome> {
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(match snapshots.get(&owner) {
            Some(snapshot) => LoadOutcome::Snapshot(snapshot.clone()),
            None => LoadOutcome::Missing,
        })
    }

    fn exists(&self, owner: OwnerId) -> bool {
        self.snapshots
            .lock()
            .map(|snapshots| snapshots.contains_key(&owner))
            .unwrap_or(false)
    }

    fn delete(&self, owner: OwnerId) -> Result<()> {
        self.snapshots
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?
            .remove(&owner);
        Ok(())
    }
}

//! File-based SnapshotRepository implementation.
//!
//! Stores one JSON document per owner. Writes are atomic (temp file +
//! rename) and each document embeds a SHA-256 digest of the snapshot body.
//! On load, malformed payloads get one structural-repair attempt; anything
//! still unreadable is preserved under a timestamped backup name and
//! reported as recovered so the caller can start from a fresh state.

use std::fs;
use std::path::{Path, PathBuf};

use loadout_core::{InventorySnapshot, OwnerId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::{RepositoryError, Result};
use super::traits::{LoadOutcome, SnapshotRepository};
use super::{migrate, repair};

/// On-disk envelope: the snapshot body plus its integrity digest.
#[derive(Debug, Serialize, Deserialize)]
struct SaveDocument {
    digest: String,
    snapshot: serde_json::Value,
}

/// File-based implementation of [`SnapshotRepository`].
///
/// # File Format
///
/// Documents are stored as `inventory_{owner}.json`; corrupted payloads are
/// preserved as `inventory_{owner}.corrupt-{timestamp}.json`, never
/// overwritten.
pub struct FileSnapshotRepository {
    base_dir: PathBuf,
}

impl FileSnapshotRepository {
    /// Create a new file-based snapshot repository.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Get the path to an owner's snapshot file.
    fn snapshot_path(&self, owner: OwnerId) -> PathBuf {
        self.base_dir.join(format!("inventory_{}.json", owner.0))
    }

    fn backup_path(&self, owner: OwnerId) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        self.base_dir
            .join(format!("inventory_{}.corrupt-{}.json", owner.0, stamp))
    }

    /// Moves an unreadable payload aside and reports the recovery.
    fn quarantine(&self, owner: OwnerId, path: &Path, reason: &str) -> Result<LoadOutcome> {
        let backup = self.backup_path(owner);
        fs::rename(path, &backup)?;
        tracing::warn!(
            "Quarantined corrupted snapshot for owner {}: {} (backup at {})",
            owner,
            reason,
            backup.display()
        );
        Ok(LoadOutcome::Recovered { backup })
    }
}

/// Hex SHA-256 over the compact serialization of a snapshot body.
pub(crate) fn digest_of(value: &serde_json::Value) -> Result<String> {
    let body = serde_json::to_string(value).map_err(|e| RepositoryError::Json(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(body.as_bytes())))
}

impl SnapshotRepository for FileSnapshotRepository {
    fn save(&self, snapshot: &InventorySnapshot) -> Result<String> {
        let path = self.snapshot_path(snapshot.owner);
        let temp_path = path.with_extension("json.tmp");

        let body =
            serde_json::to_value(snapshot).map_err(|e| RepositoryError::Json(e.to_string()))?;
        let digest = digest_of(&body)?;
        let document = SaveDocument {
            digest: digest.clone(),
            snapshot: body,
        };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| RepositoryError::Json(e.to_string()))?;

        // Write to temp file, then atomic rename
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(
            "Saved snapshot for owner {} to {}",
            snapshot.owner,
            path.display()
        );

        Ok(digest)
    }

    fn load(&self, owner: OwnerId) -> Result<LoadOutcome> {
        let path = self.snapshot_path(owner);
        if !path.exists() {
            return Ok(LoadOutcome::Missing);
        }

        let text = fs::read_to_string(&path)?;
        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(parse_error) => {
                let repaired = repair::trim_to_outermost_object(&text)
                    .and_then(|candidate| serde_json::from_str(candidate).ok());
                match repaired {
                    Some(value) => {
                        tracing::warn!(
                            "Structurally repaired snapshot for owner {}: {}",
                            owner,
                            parse_error
                        );
                        value
                    }
                    None => return self.quarantine(owner, &path, "unparseable JSON"),
                }
            }
        };

        // Unwrap the digest envelope; bare snapshots (pre-envelope files)
        // load without an integrity check.
        let (stored_digest, mut body) = match value {
            serde_json::Value::Object(mut object)
                if object.contains_key("snapshot") && object.contains_key("digest") =>
            {
                let digest = object
                    .remove("digest")
                    .and_then(|d| d.as_str().map(str::to_owned));
                let snapshot = object
                    .remove("snapshot")
                    .unwrap_or(serde_json::Value::Null);
                (digest, snapshot)
            }
            other => (None, other),
        };

        if let Some(stored) = stored_digest
            && stored != digest_of(&body)?
        {
            return self.quarantine(owner, &path, "integrity digest mismatch");
        }

        migrate::migrate_to_current(&mut body)?;

        match serde_json::from_value::<InventorySnapshot>(body) {
            Ok(snapshot) => {
                tracing::debug!("Loaded snapshot for owner {} from {}", owner, path.display());
                Ok(LoadOutcome::Snapshot(snapshot))
            }
            Err(e) => self.quarantine(owner, &path, &format!("shape mismatch: {e}")),
        }
    }

    fn exists(&self, owner: OwnerId) -> bool {
        self.snapshot_path(owner).exists()
    }

    fn delete(&self, owner: OwnerId) -> Result<()> {
        let path = self.snapshot_path(owner);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!("Deleted snapshot for owner {}", owner);
        }
        Ok(())
    }
}

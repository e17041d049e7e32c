//! Typed change notifications emitted by the inventory runtime.

use std::path::PathBuf;

use loadout_core::{DeltaBatch, InventorySnapshot, ItemStack, OwnerId, SocketId};
use serde::{Deserialize, Serialize};

/// Inventory-topic events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InventoryEvent {
    /// Full-state notification after a mutation completed.
    Changed {
        owner: OwnerId,
        snapshot: InventorySnapshot,
    },

    /// Incremental records flushed alongside a completed save. Bursts inside
    /// one debounce window arrive as a single coalesced batch.
    Delta { owner: OwnerId, batch: DeltaBatch },
}

/// Equipment-topic events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EquipmentEvent {
    /// One socket changed occupants.
    Changed {
        owner: OwnerId,
        socket: SocketId,
        new_item: Option<ItemStack>,
        old_item: Option<ItemStack>,
    },
}

/// Persistence-topic events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PersistenceEvent {
    /// Exactly one of these fires per debounced save.
    SaveCompleted {
        owner: OwnerId,
        /// SHA-256 of the persisted snapshot body.
        digest: String,
        /// Number of delta records flushed with this save.
        deltas: usize,
    },

    /// A corrupted payload was backed up and replaced with a fresh state.
    CorruptionRecovered { owner: OwnerId, backup: PathBuf },
}

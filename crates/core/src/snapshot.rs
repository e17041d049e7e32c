//! Serializable inventory state, written and read at save/load boundaries.
//!
//! The snapshot is the only type that crosses the persistence boundary; live
//! components are rebuilt from it on load. The schema is versioned: loaders
//! run an explicit migration per version instead of guessing field layouts,
//! and unknown fields default rather than fail parsing.

use std::collections::BTreeMap;

use crate::common::OwnerId;
use crate::equipment::SocketId;
use crate::stacking::ItemStack;

/// Current snapshot schema version.
///
/// v1 stored slots as a dense `stack | null` array and the currency field
/// under its old name; v2 stores sparse (index, stack) records.
pub const SCHEMA_VERSION: u32 = 2;

#[cfg(feature = "serde")]
fn legacy_schema_version() -> u32 {
    1
}

/// One occupied slot: its index and the stack it holds.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotRecord {
    pub slot: usize,
    pub stack: ItemStack,
}

/// Serializable aggregate of one entity's inventory and equipment state,
/// plus the adjacent progression fields persisted in the same document.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventorySnapshot {
    /// Payloads without the field predate versioning and parse as v1.
    #[cfg_attr(feature = "serde", serde(default = "legacy_schema_version"))]
    pub schema_version: u32,

    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: OwnerId,

    #[cfg_attr(feature = "serde", serde(default = "default_capacity"))]
    pub capacity: usize,

    #[cfg_attr(feature = "serde", serde(default))]
    pub level: u16,

    #[cfg_attr(feature = "serde", serde(default))]
    pub currency: u64,

    #[cfg_attr(feature = "serde", serde(default))]
    pub slots: Vec<SlotRecord>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub sockets: BTreeMap<SocketId, ItemStack>,
}

#[cfg(feature = "serde")]
fn default_capacity() -> usize {
    crate::config::InventoryConfig::DEFAULT_CAPACITY
}

impl InventorySnapshot {
    /// A fresh, valid state for an entity with nothing stored or equipped.
    pub fn empty(owner: OwnerId, capacity: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            owner,
            capacity,
            level: 0,
            currency: 0,
            slots: Vec::new(),
            sockets: BTreeMap::new(),
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use crate::catalog::ItemId;
    use crate::config::InventoryConfig;

    #[test]
    fn missing_fields_default_instead_of_failing() {
        let snapshot: InventorySnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot.schema_version, 1);
        assert_eq!(snapshot.capacity, InventoryConfig::DEFAULT_CAPACITY);
        assert!(snapshot.slots.is_empty());
        assert!(snapshot.sockets.is_empty());
    }

    #[test]
    fn socket_map_round_trips_with_snake_case_keys() {
        let mut snapshot = InventorySnapshot::empty(OwnerId(7), 30);
        snapshot
            .sockets
            .insert(SocketId::WeaponR, ItemStack::new(ItemId(1), 1));

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"weapon_r\""));

        let back: InventorySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}

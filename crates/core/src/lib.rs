//! Deterministic inventory and equipment rules shared across hosts.
//!
//! `loadout-core` defines the canonical rules (stacking, slot storage,
//! sockets, stat projection, transactions) and exposes pure APIs reusable by
//! the runtime and offline tools. All state mutation for one entity flows
//! through [`coordinator::TransactionCoordinator`], and supporting crates
//! depend on the types re-exported here.
pub mod catalog;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod delta;
pub mod equipment;
pub mod error;
pub mod slots;
pub mod snapshot;
pub mod stacking;
pub mod stats;

pub use catalog::{
    AffixDefinition, AffixId, CatalogProvider, Element, ItemCatalog, ItemCategory, ItemDefinition,
    ItemId, Rarity, UseEffect,
};
pub use common::{DropHandle, OwnerId, Position};
pub use config::InventoryConfig;
pub use coordinator::{
    AddItemOutcome, Disposition, DropHandler, DropRefused, EquipOutcome, EquipmentChange,
    TransactionCoordinator, TxError, UnequipOutcome, UseOutcome,
};
pub use delta::{DeltaBatch, DeltaKind, SlotDelta};
pub use equipment::{CategorySet, EquipError, EquipRejected, EquipmentController, SocketId};
pub use error::{CoreError, ErrorSeverity};
pub use slots::{AddOutcome, MoveOutcome, PlaceOutcome, SlotError, SlotStore};
pub use snapshot::{InventorySnapshot, SCHEMA_VERSION, SlotRecord};
pub use stacking::{ItemStack, SplitError, StackOverrides, can_merge, fill, split};
pub use stats::{StatBonusProjector, StatId, StatLine, StatModifier, StatTotals};

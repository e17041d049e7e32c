//! Asynchronous shell around the deterministic inventory core.
//!
//! `loadout-runtime` owns everything the pure rules crate must not: the
//! debounced persistence worker, file/memory snapshot repositories with
//! corruption recovery, the topic-based change-notification bus, and the
//! [`service::InventoryService`] facade hosts drive.
pub mod bootstrap;
pub mod events;
pub mod repository;
pub mod service;
pub mod workers;

pub use bootstrap::{BootstrapError, start_from_files};
pub use events::{EquipmentEvent, Event, EventBus, InventoryEvent, PersistenceEvent, Topic};
pub use repository::{
    FileSnapshotRepository, LoadOutcome, MemorySnapshotRepository, RepositoryError,
    SnapshotRepository,
};
pub use service::{InventoryService, ServiceError};
pub use workers::persistence::{PersistenceConfig, PersistenceError, PersistenceWorker};

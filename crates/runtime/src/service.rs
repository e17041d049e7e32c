//! Owning facade over one entity's inventory state.
//!
//! The service is the host-facing surface: mutations run synchronously on
//! the caller's thread through the owned [`TransactionCoordinator`], then
//! the service publishes change events and ships a [`StateUpdate`] to the
//! persistence worker. There is exactly one service per entity, and no
//! ambient globals are involved: catalog, drop handler, and repository all
//! arrive at construction.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use loadout_core::{
    AddItemOutcome, CatalogProvider, DropHandler, EquipOutcome, EquipmentController,
    InventoryConfig, ItemId, MoveOutcome, OwnerId, Position, SlotStore, SocketId,
    StatBonusProjector, TransactionCoordinator, TxError, UnequipOutcome, UseOutcome,
};

use crate::events::{Event, EventBus, EquipmentEvent, InventoryEvent, PersistenceEvent, Topic};
use crate::repository::{LoadOutcome, RepositoryError, SnapshotRepository};
use crate::workers::persistence::{
    Command, PersistenceConfig, PersistenceError, PersistenceWorker, StateUpdate,
};

/// Errors raised while constructing or tearing down a service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// One entity's inventory, equipment, and persistence, behind a single
/// owning handle.
pub struct InventoryService<C, D>
where
    C: CatalogProvider,
    D: DropHandler,
{
    coordinator: TransactionCoordinator<C, D>,
    bus: EventBus,
    update_tx: mpsc::UnboundedSender<StateUpdate>,
    command_tx: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
    generation: u64,
    recovery: Option<PathBuf>,
}

impl<C, D> InventoryService<C, D>
where
    C: CatalogProvider,
    D: DropHandler,
{
    /// Loads (or freshly creates) the owner's state and spawns the
    /// persistence worker.
    ///
    /// A corrupted payload does not block startup: it is backed up by the
    /// repository and the service starts from a fresh empty state, with the
    /// backup path surfaced via [`Self::recovered_from`] and a one-time
    /// persistence event.
    pub async fn start(
        catalog: Arc<C>,
        dropper: D,
        owner: OwnerId,
        config: InventoryConfig,
        repository: Box<dyn SnapshotRepository>,
    ) -> Result<Self, ServiceError> {
        let bus = EventBus::new();
        let mut coordinator = TransactionCoordinator::new(catalog, dropper, owner, &config)?;

        let mut recovery = None;
        match repository.load(owner)? {
            LoadOutcome::Snapshot(snapshot) => {
                coordinator.restore(snapshot)?;
                info!("Loaded persisted inventory for owner {}", owner);
            }
            LoadOutcome::Missing => {
                info!("No persisted inventory for owner {}; starting fresh", owner);
            }
            LoadOutcome::Recovered { backup } => {
                warn!(
                    "Inventory for owner {} was corrupted; starting fresh (backup at {})",
                    owner,
                    backup.display()
                );
                bus.publish(Event::Persistence(PersistenceEvent::CorruptionRecovered {
                    owner,
                    backup: backup.clone(),
                }));
                recovery = Some(backup);
            }
        }

        for item in coordinator.drain_unknown_items() {
            warn!("Persisted state references unknown item {}", item);
        }
        for affix in coordinator.drain_unknown_affixes() {
            warn!("Ignoring unknown affix {} on equipped item", affix);
        }

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(8);
        let worker = PersistenceWorker::new(
            PersistenceConfig::from_inventory(&config),
            repository,
            bus.clone(),
            update_rx,
            command_rx,
        );
        let worker = tokio::spawn(worker.run());

        Ok(Self {
            coordinator,
            bus,
            update_tx,
            command_tx,
            worker: Some(worker),
            generation: 0,
            recovery,
        })
    }

    // ===== mutations (synchronous, validate-then-commit) =====

    pub fn add_item(&mut self, item: ItemId, quantity: u16) -> Result<AddItemOutcome, TxError> {
        let outcome = self.coordinator.add_item(item, quantity);
        self.after_mutation();
        outcome
    }

    pub fn remove_item(&mut self, item: ItemId, quantity: u16) -> Result<(), TxError> {
        let outcome = self.coordinator.remove_item(item, quantity);
        self.after_mutation();
        outcome
    }

    pub fn move_stack(&mut self, from: usize, to: usize) -> Result<MoveOutcome, TxError> {
        let outcome = self.coordinator.move_stack(from, to);
        self.after_mutation();
        outcome
    }

    pub fn split_stack(&mut self, index: usize, amount: u16) -> Result<usize, TxError> {
        let outcome = self.coordinator.split_stack(index, amount);
        self.after_mutation();
        outcome
    }

    pub fn use_item(&mut self, index: usize) -> Result<UseOutcome, TxError> {
        let outcome = self.coordinator.use_item(index);
        self.after_mutation();
        outcome
    }

    pub fn equip_from_inventory(
        &mut self,
        slot_index: usize,
        socket: SocketId,
    ) -> Result<EquipOutcome, TxError> {
        let outcome = self.coordinator.equip_from_inventory(slot_index, socket);
        self.after_mutation();
        outcome
    }

    pub fn unequip_to_inventory(
        &mut self,
        socket: SocketId,
        preferred_slot: Option<usize>,
    ) -> UnequipOutcome {
        let outcome = self.coordinator.unequip_to_inventory(socket, preferred_slot);
        self.after_mutation();
        outcome
    }

    pub fn move_equipment(
        &mut self,
        socket_a: SocketId,
        socket_b: SocketId,
    ) -> Result<(), TxError> {
        let outcome = self.coordinator.move_equipment(socket_a, socket_b);
        self.after_mutation();
        outcome
    }

    pub fn set_level(&mut self, level: u16) {
        self.coordinator.set_level(level);
        self.after_mutation();
    }

    pub fn set_currency(&mut self, currency: u64) {
        self.coordinator.set_currency(currency);
        self.after_mutation();
    }

    /// Updates the owner's world position used for overflow drops.
    pub fn set_position(&mut self, position: Position) {
        self.coordinator.set_position(position);
    }

    // ===== persistence control =====

    /// Saves pending state immediately, skipping the debounce window.
    /// Returns whether a write actually happened.
    pub async fn flush(&self) -> Result<bool, PersistenceError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::FlushNow { reply })
            .await
            .map_err(|_| PersistenceError::WorkerUnavailable)?;
        rx.await.map_err(|_| PersistenceError::WorkerUnavailable)?
    }

    /// Stops the worker, flushing any pending save first.
    pub async fn shutdown(mut self) -> Result<(), PersistenceError> {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
        Ok(())
    }

    // ===== queries =====

    pub fn subscribe(&self, topic: Topic) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe(topic)
    }

    pub fn owner(&self) -> OwnerId {
        self.coordinator.owner()
    }

    pub fn slots(&self) -> &SlotStore {
        self.coordinator.slots()
    }

    pub fn equipment(&self) -> &EquipmentController {
        self.coordinator.equipment()
    }

    pub fn projector(&self) -> &StatBonusProjector {
        self.coordinator.projector()
    }

    pub fn total_quantity(&self, item: ItemId) -> u32 {
        self.coordinator.total_quantity(item)
    }

    pub fn level(&self) -> u16 {
        self.coordinator.level()
    }

    pub fn currency(&self) -> u64 {
        self.coordinator.currency()
    }

    /// Backup path of a corrupted payload recovered at startup, if any.
    pub fn recovered_from(&self) -> Option<&PathBuf> {
        self.recovery.as_ref()
    }

    // ===== internal =====

    /// Publishes change notifications and ships dirty state to the worker.
    ///
    /// Runs after every mutation attempt; failed operations drained nothing
    /// and ship nothing.
    fn after_mutation(&mut self) {
        let owner = self.coordinator.owner();

        for change in self.coordinator.drain_equipment_changes() {
            self.bus.publish(Event::Equipment(EquipmentEvent::Changed {
                owner,
                socket: change.socket,
                new_item: change.new_item,
                old_item: change.old_item,
            }));
        }

        for affix in self.coordinator.drain_unknown_affixes() {
            warn!("Ignoring unknown affix {} on equipped item", affix);
        }

        if self.coordinator.is_dirty() {
            let snapshot = self.coordinator.snapshot();
            let deltas = self.coordinator.drain_deltas();

            self.bus.publish(Event::Inventory(InventoryEvent::Changed {
                owner,
                snapshot: snapshot.clone(),
            }));

            self.generation += 1;
            let _ = self.update_tx.send(StateUpdate {
                snapshot,
                deltas,
                generation: self.generation,
            });
            self.coordinator.clear_dirty();
        }
    }
}

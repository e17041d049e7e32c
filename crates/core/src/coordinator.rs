//! Cross-component transaction orchestration.
//!
//! The [`TransactionCoordinator`] is the single owner of one entity's
//! [`SlotStore`]/[`EquipmentController`] pair and the only place equip,
//! unequip, and transfer flows cross component boundaries. Every operation
//! is validate-then-commit: a returned error implies zero observable
//! mutation, and no path loses an item: overflow routes to the injected
//! drop-to-world collaborator, and a refused drop rolls the transaction
//! back.

use std::sync::Arc;

use crate::catalog::{AffixId, CatalogProvider, ItemId, UseEffect};
use crate::common::{DropHandle, OwnerId, Position};
use crate::config::InventoryConfig;
use crate::delta::DeltaBatch;
use crate::equipment::{EquipError, EquipmentController, SocketId};
use crate::error::{CoreError, ErrorSeverity};
use crate::slots::{AddOutcome, MoveOutcome, PlaceOutcome, SlotError, SlotStore};
use crate::snapshot::{InventorySnapshot, SCHEMA_VERSION, SlotRecord};
use crate::stacking::{ItemStack, StackOverrides};
use crate::stats::StatBonusProjector;

/// A refused drop, handing the stack back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("drop-to-world refused stack of {}", .0.item)]
pub struct DropRefused(pub ItemStack);

/// Drop-to-world collaborator.
///
/// Invoked only as overflow/fallback, never as primary removal. A refused
/// drop must hand the stack back so the coordinator can roll back instead of
/// losing the item.
pub trait DropHandler {
    fn spawn_in_world(
        &mut self,
        stack: ItemStack,
        position: Position,
    ) -> Result<DropHandle, DropRefused>;
}

/// Errors raised by coordinator transactions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Equip(#[from] EquipError),

    /// The item has no use effect.
    #[error("item {0} cannot be used")]
    NotUsable(ItemId),
}

impl CoreError for TxError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            TxError::Slot(e) => e.severity(),
            TxError::Equip(e) => e.severity(),
            TxError::NotUsable(_) => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            TxError::Slot(e) => e.error_code(),
            TxError::Equip(e) => e.error_code(),
            TxError::NotUsable(_) => "TX_NOT_USABLE",
        }
    }
}

/// Where a displaced or overflowing stack ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Returned to the inventory at this slot.
    Stored(usize),
    /// Handed to the drop-to-world collaborator.
    Dropped(DropHandle),
}

/// Result of [`TransactionCoordinator::equip_from_inventory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EquipOutcome {
    pub socket: SocketId,
    /// Fate of the previous occupant, if the socket was occupied.
    pub previous: Option<Disposition>,
}

/// Result of [`TransactionCoordinator::unequip_to_inventory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnequipOutcome {
    /// The socket held nothing; no-op.
    SocketEmpty,
    /// The item landed in this inventory slot.
    Stored(usize),
    /// Inventory full; the item went to the drop-to-world collaborator.
    Dropped(DropHandle),
    /// Both inventory and drop refused; the item was re-equipped to avoid
    /// loss.
    ReEquipped,
}

/// Result of [`TransactionCoordinator::add_item`].
///
/// `remainder > 0` with `dropped == None` means the overflow handler refused
/// the excess; those units were never created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddItemOutcome {
    pub added: u16,
    pub remainder: u16,
    pub dropped: Option<DropHandle>,
}

/// Result of [`TransactionCoordinator::use_item`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UseOutcome {
    pub effect: UseEffect,
    /// Units of the item left in the source slot after consumption.
    pub remaining: u16,
}

/// One observable equipment mutation, drained by the host for notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquipmentChange {
    pub socket: SocketId,
    pub new_item: Option<ItemStack>,
    pub old_item: Option<ItemStack>,
}

/// Orchestrates equip/unequip/transfer across slot storage, sockets, and
/// stat projection, atomically.
///
/// Exactly one coordinator owns one entity's pair; collaborators (catalog,
/// drop handler) arrive at construction.
pub struct TransactionCoordinator<C, D>
where
    C: CatalogProvider,
    D: DropHandler,
{
    catalog: Arc<C>,
    dropper: D,
    owner: OwnerId,
    position: Position,
    level: u16,
    currency: u64,
    slots: SlotStore,
    equipment: EquipmentController,
    projector: StatBonusProjector,
    equipment_changes: Vec<EquipmentChange>,
    unknown_affixes: Vec<AffixId>,
    unknown_items: Vec<ItemId>,
    dirty: bool,
}

impl<C, D> TransactionCoordinator<C, D>
where
    C: CatalogProvider,
    D: DropHandler,
{
    pub fn new(
        catalog: Arc<C>,
        dropper: D,
        owner: OwnerId,
        config: &InventoryConfig,
    ) -> Result<Self, TxError> {
        Ok(Self {
            catalog,
            dropper,
            owner,
            position: Position::ORIGIN,
            level: 0,
            currency: 0,
            slots: SlotStore::new(config.capacity)?,
            equipment: EquipmentController::new(),
            projector: StatBonusProjector::new(),
            equipment_changes: Vec::new(),
            unknown_affixes: Vec::new(),
            unknown_items: Vec::new(),
            dirty: false,
        })
    }

    // ===== inventory pass-through operations =====

    /// Adds a quantity of one item; overflow goes to the drop handler.
    pub fn add_item(&mut self, item: ItemId, quantity: u16) -> Result<AddItemOutcome, TxError> {
        self.add_item_with(item, quantity, None)
    }

    /// Adds a quantity carrying per-instance overrides.
    pub fn add_item_with(
        &mut self,
        item: ItemId,
        quantity: u16,
        overrides: Option<StackOverrides>,
    ) -> Result<AddItemOutcome, TxError> {
        let AddOutcome { added, remainder } =
            self.slots
                .add(&*self.catalog, item, quantity, overrides.clone())?;
        if added > 0 {
            self.dirty = true;
        }

        let mut dropped = None;
        let mut remainder = remainder;
        if remainder > 0 {
            let overflow = ItemStack {
                item,
                quantity: remainder,
                overrides,
            };
            match self.dropper.spawn_in_world(overflow, self.position) {
                Ok(handle) => {
                    dropped = Some(handle);
                }
                Err(DropRefused(_)) => {
                    // Refused overflow is reported back; the units were
                    // never created, so nothing is lost.
                }
            }
            if dropped.is_some() {
                remainder = 0;
            }
        }

        Ok(AddItemOutcome {
            added,
            remainder,
            dropped,
        })
    }

    /// Removes a quantity of one item from the inventory, all-or-nothing.
    pub fn remove_item(&mut self, item: ItemId, quantity: u16) -> Result<(), TxError> {
        self.slots.remove(item, quantity)?;
        if quantity > 0 {
            self.dirty = true;
        }
        Ok(())
    }

    /// Moves, merges, or swaps between two inventory slots.
    pub fn move_stack(&mut self, from: usize, to: usize) -> Result<MoveOutcome, TxError> {
        let outcome = self.slots.move_stack(&*self.catalog, from, to)?;
        if outcome != MoveOutcome::NoOp {
            self.dirty = true;
        }
        Ok(outcome)
    }

    /// Splits a stack into the first empty slot, returning the new index.
    pub fn split_stack(&mut self, index: usize, amount: u16) -> Result<usize, TxError> {
        let target = self.slots.split(index, amount)?;
        self.dirty = true;
        Ok(target)
    }

    /// Consumes one unit of a usable item and reports its effect.
    pub fn use_item(&mut self, index: usize) -> Result<UseOutcome, TxError> {
        let stack = self
            .slots
            .get(index)
            .ok_or(SlotError::SlotEmpty { index })?;
        let item = stack.item;
        let definition = self
            .catalog
            .lookup(item)
            .ok_or(SlotError::UnknownItem(item))?;
        let effect = definition.use_effect.ok_or(TxError::NotUsable(item))?;

        self.slots.take_from_slot(index, 1)?;
        self.dirty = true;

        Ok(UseOutcome {
            effect,
            remaining: self.slots.get(index).map(|s| s.quantity).unwrap_or(0),
        })
    }

    // ===== equip/unequip transactions =====

    /// Equips one unit from an inventory slot into a socket.
    ///
    /// Validation happens before any mutation; equipped items are always
    /// singleton regardless of the source stack size. A displaced previous
    /// occupant returns to the inventory (preferring the source slot) or
    /// goes to the drop handler; if both refuse, the whole transaction rolls
    /// back.
    pub fn equip_from_inventory(
        &mut self,
        slot_index: usize,
        socket: SocketId,
    ) -> Result<EquipOutcome, TxError> {
        let stack = self
            .slots
            .get(slot_index)
            .ok_or(SlotError::SlotEmpty { index: slot_index })?;
        let candidate = ItemStack {
            item: stack.item,
            quantity: 1,
            overrides: stack.overrides.clone(),
        };
        self.equipment.check(&*self.catalog, &candidate, socket)?;

        let taken = self.slots.take_from_slot(slot_index, 1)?;
        let previous = match self.equipment.equip(&*self.catalog, taken, socket) {
            Ok(previous) => previous,
            Err(rejected) => {
                // Pre-validated above; defensively return the unit to its
                // source rather than lose it.
                self.slots.give_back(slot_index, rejected.stack);
                return Err(rejected.error.into());
            }
        };

        let old_item = previous.clone();
        let disposition = match previous {
            None => None,
            Some(displaced) => match self.settle(displaced, Some(slot_index)) {
                Ok(disposition) => Some(disposition),
                Err(displaced) => {
                    // Neither inventory nor world would take the displaced
                    // occupant: roll the whole transaction back.
                    let equipped = self.equipment.unequip(socket);
                    self.equipment.restore(socket, displaced);
                    if let Some(equipped) = equipped {
                        self.slots.give_back(slot_index, equipped);
                    }
                    return Err(SlotError::NoEmptySlot.into());
                }
            },
        };

        let unknown =
            self.projector
                .refresh_socket(&*self.catalog, socket, self.equipment.occupant(socket));
        self.unknown_affixes.extend(unknown);

        self.equipment_changes.push(EquipmentChange {
            socket,
            new_item: self.equipment.occupant(socket).cloned(),
            old_item,
        });
        self.dirty = true;

        Ok(EquipOutcome {
            socket,
            previous: disposition,
        })
    }

    /// Unequips a socket back into the inventory.
    ///
    /// Prefers `preferred_slot` when given. On inventory overflow the item
    /// goes to the drop handler; only if that also refuses is the item
    /// re-equipped, so it is never lost.
    pub fn unequip_to_inventory(
        &mut self,
        socket: SocketId,
        preferred_slot: Option<usize>,
    ) -> UnequipOutcome {
        let Some(stack) = self.equipment.unequip(socket) else {
            return UnequipOutcome::SocketEmpty;
        };
        let old_item = Some(stack.clone());

        let outcome = match self.settle(stack, preferred_slot) {
            Ok(Disposition::Stored(slot)) => UnequipOutcome::Stored(slot),
            Ok(Disposition::Dropped(handle)) => UnequipOutcome::Dropped(handle),
            Err(stack) => {
                self.equipment.restore(socket, stack);
                return UnequipOutcome::ReEquipped;
            }
        };

        self.projector.clear_socket(socket);
        self.equipment_changes.push(EquipmentChange {
            socket,
            new_item: None,
            old_item,
        });
        self.dirty = true;
        outcome
    }

    /// Swaps two sockets; a same-socket request is a no-op.
    pub fn move_equipment(
        &mut self,
        socket_a: SocketId,
        socket_b: SocketId,
    ) -> Result<(), TxError> {
        if socket_a == socket_b {
            return Ok(());
        }

        let before_a = self.equipment.occupant(socket_a).cloned();
        let before_b = self.equipment.occupant(socket_b).cloned();
        if before_a.is_none() && before_b.is_none() {
            return Ok(());
        }

        self.equipment.swap(&*self.catalog, socket_a, socket_b)?;

        for (socket, before) in [(socket_a, before_a), (socket_b, before_b)] {
            let unknown = self.projector.refresh_socket(
                &*self.catalog,
                socket,
                self.equipment.occupant(socket),
            );
            self.unknown_affixes.extend(unknown);
            self.equipment_changes.push(EquipmentChange {
                socket,
                new_item: self.equipment.occupant(socket).cloned(),
                old_item: before,
            });
        }
        self.dirty = true;
        Ok(())
    }

    // ===== persistence boundary =====

    /// Captures the current state as a serializable snapshot.
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            schema_version: SCHEMA_VERSION,
            owner: self.owner,
            capacity: self.slots.capacity(),
            level: self.level,
            currency: self.currency,
            slots: self
                .slots
                .occupied()
                .map(|(slot, stack)| SlotRecord {
                    slot,
                    stack: stack.clone(),
                })
                .collect(),
            sockets: self.equipment.to_sockets(),
        }
    }

    /// Rebuilds live state from a snapshot.
    ///
    /// Forward-compatible: stacks referencing unknown items are kept and
    /// surfaced via [`Self::drain_unknown_items`]. A socket occupant that
    /// fails category validation against the current catalog is evicted
    /// into the inventory (or the drop handler) so the compatibility
    /// invariant holds after every load.
    pub fn restore(&mut self, snapshot: InventorySnapshot) -> Result<(), TxError> {
        let slots = SlotStore::from_records(
            snapshot.capacity,
            snapshot
                .slots
                .into_iter()
                .map(|record| (record.slot, record.stack)),
        )?;

        self.owner = snapshot.owner;
        self.level = snapshot.level;
        self.currency = snapshot.currency;
        self.slots = slots;
        self.equipment = EquipmentController::from_sockets(snapshot.sockets);
        self.projector.clear();
        self.dirty = false;

        let missing: Vec<ItemId> = self
            .slots
            .occupied()
            .map(|(_, stack)| stack.item)
            .filter(|item| self.catalog.lookup(*item).is_none())
            .collect();
        self.unknown_items.extend(missing);
        let missing = self.equipment.unknown_occupants(&*self.catalog);
        self.unknown_items.extend(missing);

        // Evict occupants the current catalog no longer allows in their
        // socket, then project modifiers for everything that remains.
        let mut evicted = Vec::new();
        for socket in SocketId::ALL {
            if let Some(stack) = self.equipment.occupant(socket)
                && let Some(definition) = self.catalog.lookup(stack.item)
                && !socket.accepts(definition.category)
            {
                evicted.push(socket);
            }
        }
        for socket in evicted {
            if let Some(stack) = self.equipment.unequip(socket) {
                match self.settle(stack, None) {
                    Ok(_) => {}
                    Err(stack) => {
                        // Nowhere to put the invalid occupant; keep it
                        // equipped rather than lose it.
                        self.equipment.restore(socket, stack);
                    }
                }
                self.dirty = true;
            }
        }

        for socket in SocketId::ALL {
            if self.equipment.is_occupied(socket) {
                let unknown = self.projector.refresh_socket(
                    &*self.catalog,
                    socket,
                    self.equipment.occupant(socket),
                );
                self.unknown_affixes.extend(unknown);
            }
        }

        Ok(())
    }

    // ===== adjacent progression fields =====

    pub fn set_level(&mut self, level: u16) {
        if self.level != level {
            self.level = level;
            self.dirty = true;
        }
    }

    pub fn set_currency(&mut self, currency: u64) {
        if self.currency != currency {
            self.currency = currency;
            self.dirty = true;
        }
    }

    /// Updates the owner's world position used for overflow drops.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    // ===== queries and drains =====

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn level(&self) -> u16 {
        self.level
    }

    pub fn currency(&self) -> u64 {
        self.currency
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn equipment(&self) -> &EquipmentController {
        &self.equipment
    }

    pub fn projector(&self) -> &StatBonusProjector {
        &self.projector
    }

    /// Total quantity of `item` across slots and sockets.
    pub fn total_quantity(&self, item: ItemId) -> u32 {
        self.slots.quantity_of(item) + self.equipment.quantity_of(item)
    }

    /// True if any mutation occurred since the dirty flag was last cleared.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Takes the slot deltas accumulated since the previous drain.
    pub fn drain_deltas(&mut self) -> DeltaBatch {
        self.slots.drain_deltas()
    }

    /// Takes the equipment mutations accumulated since the previous drain.
    pub fn drain_equipment_changes(&mut self) -> Vec<EquipmentChange> {
        core::mem::take(&mut self.equipment_changes)
    }

    /// Takes affix ids that failed catalog resolution, for warning logs.
    pub fn drain_unknown_affixes(&mut self) -> Vec<AffixId> {
        core::mem::take(&mut self.unknown_affixes)
    }

    /// Takes item ids that failed catalog resolution during restore.
    pub fn drain_unknown_items(&mut self) -> Vec<ItemId> {
        core::mem::take(&mut self.unknown_items)
    }

    // ===== internal helpers =====

    /// Stores a stack in the inventory or hands it to the drop handler.
    /// Returns the stack when both refuse.
    fn settle(
        &mut self,
        stack: ItemStack,
        preferred: Option<usize>,
    ) -> Result<Disposition, ItemStack> {
        match self.slots.place(&*self.catalog, stack, preferred) {
            PlaceOutcome::Placed { slot } => Ok(Disposition::Stored(slot)),
            PlaceOutcome::Rejected(stack) => {
                match self.dropper.spawn_in_world(stack, self.position) {
                    Ok(handle) => Ok(Disposition::Dropped(handle)),
                    Err(DropRefused(stack)) => Err(stack),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ItemCatalog, ItemCategory, ItemDefinition};
    use crate::stats::{StatId, StatLine};
    use std::cell::RefCell;
    use std::rc::Rc;

    const POTION: ItemId = ItemId(1);
    const SWORD: ItemId = ItemId(2);
    const SHIELD: ItemId = ItemId(3);
    const KNIFE: ItemId = ItemId(4);

    /// Records every drop; optionally refuses them all.
    #[derive(Clone, Default)]
    struct RecordingDropper {
        drops: Rc<RefCell<Vec<ItemStack>>>,
        refuse: bool,
    }

    impl RecordingDropper {
        fn refusing() -> Self {
            Self {
                refuse: true,
                ..Self::default()
            }
        }

        fn drop_count(&self) -> usize {
            self.drops.borrow().len()
        }
    }

    impl DropHandler for RecordingDropper {
        fn spawn_in_world(
            &mut self,
            stack: ItemStack,
            _position: Position,
        ) -> Result<DropHandle, DropRefused> {
            if self.refuse {
                return Err(DropRefused(stack));
            }
            let mut drops = self.drops.borrow_mut();
            drops.push(stack);
            Ok(DropHandle(drops.len() as u64))
        }
    }

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(ItemCatalog::new(
            [
                ItemDefinition::new(POTION, "potion", ItemCategory::Consumable)
                    .with_max_stack(99)
                    .with_use_effect(UseEffect::Heal(25)),
                ItemDefinition::new(SWORD, "sword", ItemCategory::Weapon)
                    .with_base_stats(vec![StatLine::flat(StatId::Attack, 12)]),
                ItemDefinition::new(SHIELD, "shield", ItemCategory::Shield)
                    .with_base_stats(vec![StatLine::flat(StatId::Defense, 8)]),
                ItemDefinition::new(KNIFE, "throwing knife", ItemCategory::Weapon)
                    .with_max_stack(20)
                    .with_base_stats(vec![StatLine::flat(StatId::Attack, 4)]),
            ],
            [],
        ))
    }

    fn coordinator(
        capacity: usize,
        dropper: RecordingDropper,
    ) -> TransactionCoordinator<ItemCatalog, RecordingDropper> {
        TransactionCoordinator::new(
            catalog(),
            dropper,
            OwnerId::PLAYER,
            &InventoryConfig::with_capacity(capacity),
        )
        .unwrap()
    }

    fn fill_inventory(tx: &mut TransactionCoordinator<ItemCatalog, RecordingDropper>) {
        while !tx.slots().is_full() {
            tx.add_item(SWORD, 1).unwrap();
        }
        tx.drain_deltas();
        tx.clear_dirty();
    }

    #[test]
    fn add_into_full_inventory_invokes_overflow_once() {
        let dropper = RecordingDropper::default();
        let mut tx = coordinator(30, dropper.clone());
        fill_inventory(&mut tx);
        let before = tx.total_quantity(SWORD);

        let outcome = tx.add_item(SWORD, 1).unwrap();
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.remainder, 0); // handed to the overflow collaborator
        assert!(outcome.dropped.is_some());
        assert_eq!(dropper.drop_count(), 1);
        assert_eq!(tx.total_quantity(SWORD), before);
    }

    #[test]
    fn category_mismatch_rejects_with_zero_state_change() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(SWORD, 1).unwrap();
        tx.drain_deltas();
        tx.clear_dirty();

        let err = tx.equip_from_inventory(0, SocketId::Helmet).unwrap_err();
        assert!(matches!(
            err,
            TxError::Equip(EquipError::CategoryMismatch { .. })
        ));
        assert_eq!(tx.slots().get(0).unwrap().item, SWORD);
        assert!(tx.projector().modifiers().is_empty());
        assert!(tx.drain_deltas().is_empty());
        assert!(!tx.is_dirty());
    }

    #[test]
    fn equip_takes_exactly_one_unit_from_a_larger_stack() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(KNIFE, 5).unwrap();

        tx.equip_from_inventory(0, SocketId::WeaponR).unwrap();
        assert_eq!(tx.slots().get(0).unwrap().quantity, 4);
        assert_eq!(tx.equipment().occupant(SocketId::WeaponR).unwrap().quantity, 1);
        assert_eq!(tx.total_quantity(KNIFE), 5);
    }

    #[test]
    fn equip_displacing_previous_returns_it_to_inventory() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(SHIELD, 1).unwrap();
        tx.add_item(SWORD, 1).unwrap();
        tx.equip_from_inventory(0, SocketId::WeaponL).unwrap();

        let outcome = tx.equip_from_inventory(1, SocketId::WeaponL).unwrap();
        assert!(matches!(outcome.previous, Some(Disposition::Stored(_))));
        assert_eq!(tx.equipment().occupant(SocketId::WeaponL).unwrap().item, SWORD);
        assert_eq!(tx.slots().quantity_of(SHIELD), 1);
        assert_eq!(tx.total_quantity(SWORD), 1);
        assert_eq!(tx.total_quantity(SHIELD), 1);
    }

    #[test]
    fn equip_displacing_previous_drops_when_inventory_is_full() {
        let dropper = RecordingDropper::default();
        let mut tx = coordinator(2, dropper.clone());
        tx.add_item(SHIELD, 1).unwrap();
        tx.equip_from_inventory(0, SocketId::WeaponL).unwrap();
        // Knife stack keeps the source slot occupied after one unit leaves,
        // so the displaced shield finds the inventory full.
        tx.add_item(KNIFE, 2).unwrap();
        tx.add_item(SWORD, 1).unwrap();

        let outcome = tx.equip_from_inventory(0, SocketId::WeaponL).unwrap();
        assert!(matches!(outcome.previous, Some(Disposition::Dropped(_))));
        assert_eq!(tx.equipment().occupant(SocketId::WeaponL).unwrap().item, KNIFE);
        assert!(dropper.drops.borrow().iter().any(|s| s.item == SHIELD));
        assert_eq!(tx.total_quantity(KNIFE), 2);
    }

    #[test]
    fn equip_rolls_back_when_inventory_and_drop_both_refuse() {
        let mut tx = coordinator(2, RecordingDropper::refusing());
        tx.add_item(SHIELD, 1).unwrap();
        tx.equip_from_inventory(0, SocketId::WeaponL).unwrap();
        tx.add_item(KNIFE, 2).unwrap();
        tx.add_item(SWORD, 1).unwrap();

        let err = tx.equip_from_inventory(0, SocketId::WeaponL).unwrap_err();
        assert!(matches!(err, TxError::Slot(SlotError::NoEmptySlot)));
        // Shield stays equipped, the knife unit returns to its stack.
        assert_eq!(tx.equipment().occupant(SocketId::WeaponL).unwrap().item, SHIELD);
        assert_eq!(tx.slots().get(0).unwrap().quantity, 2);
        assert_eq!(tx.total_quantity(KNIFE), 2);
        assert_eq!(tx.total_quantity(SHIELD), 1);
    }

    #[test]
    fn equip_round_trip_restores_inventory_and_clears_modifiers() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(SWORD, 1).unwrap();
        tx.add_item(POTION, 10).unwrap();
        let slots_before: Vec<_> = tx
            .slots()
            .occupied()
            .map(|(i, s)| (i, s.clone()))
            .collect();

        tx.equip_from_inventory(0, SocketId::WeaponR).unwrap();
        assert_eq!(tx.projector().totals(StatId::Attack).flat, 12);

        let outcome = tx.unequip_to_inventory(SocketId::WeaponR, Some(0));
        assert_eq!(outcome, UnequipOutcome::Stored(0));

        let slots_after: Vec<_> = tx
            .slots()
            .occupied()
            .map(|(i, s)| (i, s.clone()))
            .collect();
        assert_eq!(slots_after, slots_before);
        assert!(tx
            .projector()
            .modifiers_for(SocketId::WeaponR)
            .next()
            .is_none());
    }

    #[test]
    fn unequip_into_full_inventory_drops_to_world() {
        let dropper = RecordingDropper::default();
        let mut tx = coordinator(4, dropper.clone());
        tx.add_item(SWORD, 1).unwrap();
        tx.equip_from_inventory(0, SocketId::WeaponR).unwrap();
        fill_inventory(&mut tx);

        let outcome = tx.unequip_to_inventory(SocketId::WeaponR, None);
        assert!(matches!(outcome, UnequipOutcome::Dropped(_)));
        assert!(!tx.equipment().is_occupied(SocketId::WeaponR));
        assert_eq!(dropper.drop_count(), 1);
    }

    #[test]
    fn unequip_reequips_when_inventory_and_drop_both_refuse() {
        let mut tx = coordinator(4, RecordingDropper::refusing());
        tx.add_item(SWORD, 1).unwrap();
        tx.equip_from_inventory(0, SocketId::WeaponR).unwrap();
        fill_inventory(&mut tx);

        let outcome = tx.unequip_to_inventory(SocketId::WeaponR, None);
        assert_eq!(outcome, UnequipOutcome::ReEquipped);
        assert_eq!(tx.equipment().occupant(SocketId::WeaponR).unwrap().item, SWORD);
        // Modifiers survive because the socket never observably changed.
        assert_eq!(tx.projector().totals(StatId::Attack).flat, 12);
    }

    #[test]
    fn unequip_empty_socket_is_a_no_op() {
        let mut tx = coordinator(30, RecordingDropper::default());
        assert_eq!(
            tx.unequip_to_inventory(SocketId::Back, None),
            UnequipOutcome::SocketEmpty
        );
        assert!(!tx.is_dirty());
    }

    #[test]
    fn move_equipment_swaps_modifier_sources() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(SWORD, 1).unwrap();
        tx.equip_from_inventory(0, SocketId::WeaponR).unwrap();

        tx.move_equipment(SocketId::WeaponR, SocketId::WeaponL).unwrap();
        assert!(!tx.equipment().is_occupied(SocketId::WeaponR));
        assert_eq!(tx.equipment().occupant(SocketId::WeaponL).unwrap().item, SWORD);
        assert!(tx
            .projector()
            .modifiers_for(SocketId::WeaponR)
            .next()
            .is_none());
        assert_eq!(tx.projector().totals(StatId::Attack).flat, 12);
    }

    #[test]
    fn conservation_across_mixed_operation_sequences() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(POTION, 120).unwrap();
        tx.add_item(SWORD, 2).unwrap();

        tx.split_stack(0, 30).unwrap();
        tx.move_stack(0, 5).unwrap();
        tx.equip_from_inventory(2, SocketId::WeaponR).unwrap();
        tx.move_equipment(SocketId::WeaponR, SocketId::WeaponL).unwrap();
        tx.unequip_to_inventory(SocketId::WeaponL, None);

        assert_eq!(tx.total_quantity(POTION), 120);
        assert_eq!(tx.total_quantity(SWORD), 2);

        tx.remove_item(POTION, 20).unwrap();
        assert_eq!(tx.total_quantity(POTION), 100);
    }

    #[test]
    fn use_item_consumes_one_unit_and_reports_the_effect() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(POTION, 3).unwrap();

        let outcome = tx.use_item(0).unwrap();
        assert_eq!(outcome.effect, UseEffect::Heal(25));
        assert_eq!(outcome.remaining, 2);

        tx.use_item(0).unwrap();
        let outcome = tx.use_item(0).unwrap();
        assert_eq!(outcome.remaining, 0);
        assert!(tx.slots().get(0).is_none()); // destroyed at quantity 0
    }

    #[test]
    fn use_item_rejects_non_consumables() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(SWORD, 1).unwrap();
        assert!(matches!(tx.use_item(0), Err(TxError::NotUsable(SWORD))));
        assert_eq!(tx.total_quantity(SWORD), 1);
    }

    #[test]
    fn snapshot_restore_round_trips_state() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(POTION, 150).unwrap();
        tx.add_item(SWORD, 1).unwrap();
        tx.equip_from_inventory(2, SocketId::WeaponR).unwrap();
        tx.set_level(12);
        tx.set_currency(4_500);

        let snapshot = tx.snapshot();

        let mut restored = coordinator(30, RecordingDropper::default());
        restored.restore(snapshot.clone()).unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.total_quantity(POTION), 150);
        assert_eq!(restored.total_quantity(SWORD), 1);
        assert_eq!(restored.level(), 12);
        assert_eq!(restored.currency(), 4_500);
        // Modifiers are reprojected from the restored sockets.
        assert_eq!(restored.projector().totals(StatId::Attack).flat, 12);
        assert!(!restored.is_dirty());
    }

    #[test]
    fn every_modifier_names_an_occupied_socket() {
        let mut tx = coordinator(30, RecordingDropper::default());
        tx.add_item(SWORD, 1).unwrap();
        tx.add_item(SHIELD, 1).unwrap();
        tx.equip_from_inventory(0, SocketId::WeaponR).unwrap();
        tx.equip_from_inventory(1, SocketId::WeaponL).unwrap();
        tx.move_equipment(SocketId::WeaponR, SocketId::WeaponL).unwrap_err();
        tx.unequip_to_inventory(SocketId::WeaponL, None);

        for modifier in tx.projector().modifiers() {
            assert!(tx.equipment().is_occupied(modifier.source));
        }
    }
}

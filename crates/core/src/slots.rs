//! Slot-based item storage for one entity.
//!
//! A [`SlotStore`] is a fixed-size array of stack slots addressed by index.
//! All mutation goes through validate-then-commit operations that record
//! [`SlotDelta`]s and bump per-slot version counters; queries are O(N) scans,
//! acceptable for tens of slots.

use arrayvec::ArrayVec;

use crate::catalog::{CatalogProvider, ItemId};
use crate::config::InventoryConfig;
use crate::delta::{DeltaBatch, DeltaKind, SlotDelta};
use crate::error::{CoreError, ErrorSeverity};
use crate::stacking::{self, ItemStack, SplitError, StackOverrides};

/// Errors that occur during slot store operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotError {
    /// Slot index outside [0, capacity).
    #[error("slot index {index} out of bounds (capacity {capacity})")]
    IndexOutOfBounds { index: usize, capacity: usize },

    /// The addressed slot holds no stack.
    #[error("slot {index} is empty")]
    SlotEmpty { index: usize },

    /// The item id has no catalog definition.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    /// All-or-nothing removal rejected: not enough total quantity.
    #[error("insufficient quantity of {item}: requested {requested}, available {available}")]
    InsufficientQuantity {
        item: ItemId,
        requested: u16,
        available: u32,
    },

    /// Every slot is occupied.
    #[error("no empty slot available")]
    NoEmptySlot,

    /// Take amount must satisfy `0 < amount <= quantity`.
    #[error("cannot take {amount} from slot {index} holding {quantity}")]
    InvalidTakeAmount {
        index: usize,
        amount: u16,
        quantity: u16,
    },

    /// Requested capacity exceeds the compile-time slot maximum.
    #[error("capacity {requested} exceeds the supported maximum {max}")]
    CapacityTooLarge { requested: usize, max: usize },

    /// Persisted records address the same slot twice.
    #[error("duplicate slot index {index} in persisted records")]
    DuplicateRecord { index: usize },

    #[error(transparent)]
    Split(#[from] SplitError),
}

impl CoreError for SlotError {
    fn severity(&self) -> ErrorSeverity {
        use SlotError::*;
        match self {
            // A full inventory may free up; retry after the player makes room
            NoEmptySlot => ErrorSeverity::Recoverable,

            // Duplicate records indicate corrupted persisted data
            DuplicateRecord { .. } => ErrorSeverity::Internal,

            Split(e) => e.severity(),

            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        use SlotError::*;
        match self {
            IndexOutOfBounds { .. } => "SLOT_INDEX_OUT_OF_BOUNDS",
            SlotEmpty { .. } => "SLOT_EMPTY",
            UnknownItem(_) => "SLOT_UNKNOWN_ITEM",
            InsufficientQuantity { .. } => "SLOT_INSUFFICIENT_QUANTITY",
            NoEmptySlot => "SLOT_NO_EMPTY_SLOT",
            InvalidTakeAmount { .. } => "SLOT_INVALID_TAKE_AMOUNT",
            CapacityTooLarge { .. } => "SLOT_CAPACITY_TOO_LARGE",
            DuplicateRecord { .. } => "SLOT_DUPLICATE_RECORD",
            Split(e) => e.error_code(),
        }
    }
}

/// Result of an [`SlotStore::add`] call.
///
/// The remainder is never silently discarded; it signals overflow to the
/// caller's policy (typically drop-to-world).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddOutcome {
    pub added: u16,
    pub remainder: u16,
}

/// Result of a [`SlotStore::move_stack`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Source and destination were the same index.
    NoOp,
    /// The stack relocated into an empty destination.
    Moved,
    /// Stacks merged; any remainder stays in the source slot.
    Merged { transferred: u16 },
    /// Incompatible stacks exchanged slots wholesale.
    Swapped,
}

/// Result of a whole-stack [`SlotStore::place`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// The entire stack landed in (or merged into) `slot`.
    Placed { slot: usize },
    /// No slot could hold the whole stack; ownership returns to the caller.
    Rejected(ItemStack),
}

/// Fixed-size array of stack slots for one entity.
///
/// Slots are addressed by index in [0, capacity). Each slot holds at most one
/// stack and carries a monotonically increasing version counter; asynchronous
/// consumers compare versions to discard stale results instead of locking.
#[derive(Clone, Debug, Default)]
pub struct SlotStore {
    slots: ArrayVec<Option<ItemStack>, { InventoryConfig::MAX_SLOTS }>,
    versions: ArrayVec<u64, { InventoryConfig::MAX_SLOTS }>,
    deltas: DeltaBatch,
}

impl SlotStore {
    pub fn new(capacity: usize) -> Result<Self, SlotError> {
        if capacity > InventoryConfig::MAX_SLOTS {
            return Err(SlotError::CapacityTooLarge {
                requested: capacity,
                max: InventoryConfig::MAX_SLOTS,
            });
        }

        let mut slots = ArrayVec::new();
        let mut versions = ArrayVec::new();
        for _ in 0..capacity {
            slots.push(None);
            versions.push(0);
        }

        Ok(Self {
            slots,
            versions,
            deltas: DeltaBatch::new(),
        })
    }

    /// Rebuilds a store from persisted (index, stack) records.
    ///
    /// Load is not a mutation: no deltas are recorded and versions reset.
    pub fn from_records(
        capacity: usize,
        records: impl IntoIterator<Item = (usize, ItemStack)>,
    ) -> Result<Self, SlotError> {
        let mut store = Self::new(capacity)?;
        for (index, stack) in records {
            store.check_index(index)?;
            if store.slots[index].is_some() {
                return Err(SlotError::DuplicateRecord { index });
            }
            store.slots[index] = Some(stack);
        }
        Ok(store)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Stack at `index`, or `None` if the slot is empty or out of bounds.
    pub fn get(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Monotonic mutation counter for one slot.
    pub fn version(&self, index: usize) -> Option<u64> {
        self.versions.get(index).copied()
    }

    /// Total quantity of `item` across all slots.
    pub fn quantity_of(&self, item: ItemId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.item == item)
            .map(|stack| u32::from(stack.quantity))
            .sum()
    }

    /// Lowest empty slot index, if any.
    pub fn first_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.first_empty_slot().is_none()
    }

    /// Iterates occupied slots in ascending index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|stack| (index, stack)))
    }

    /// Takes all deltas accumulated since the previous drain.
    pub fn drain_deltas(&mut self) -> DeltaBatch {
        self.deltas.take()
    }

    /// Adds a quantity of one item.
    ///
    /// Pass 1 tops up existing compatible non-full stacks in ascending slot
    /// order; pass 2 allocates new stacks into empty slots (ascending order),
    /// each sized `min(remainder, max_stack)`, until the remainder is 0 or no
    /// empty slot remains.
    pub fn add(
        &mut self,
        catalog: &dyn CatalogProvider,
        item: ItemId,
        quantity: u16,
        overrides: Option<StackOverrides>,
    ) -> Result<AddOutcome, SlotError> {
        if quantity == 0 {
            return Ok(AddOutcome {
                added: 0,
                remainder: 0,
            });
        }

        let definition = catalog.lookup(item).ok_or(SlotError::UnknownItem(item))?;
        let max_stack = definition.max_stack;
        let incoming_plain = overrides
            .as_ref()
            .is_none_or(StackOverrides::is_empty);

        let mut remaining = quantity;

        // Pass 1: top up existing stacks. Overridden incoming quantities skip
        // this pass entirely (modified items never silently combine).
        if incoming_plain {
            for index in 0..self.slots.len() {
                if remaining == 0 {
                    break;
                }
                let Some(stack) = self.slots[index].as_mut() else {
                    continue;
                };
                if stack.item != item || !stack.is_plain() || stack.quantity >= max_stack {
                    continue;
                }

                let (accepted, rest) = stacking::fill(stack, remaining, max_stack);
                let new_quantity = stack.quantity;
                remaining = rest;
                if accepted > 0 {
                    self.touch(index);
                    self.record(
                        DeltaKind::QuantityChanged,
                        item,
                        index,
                        i32::from(accepted),
                        new_quantity,
                    );
                }
            }
        }

        // Pass 2: allocate new stacks into empty slots.
        for index in 0..self.slots.len() {
            if remaining == 0 {
                break;
            }
            if self.slots[index].is_some() {
                continue;
            }

            let portion = remaining.min(max_stack);
            self.slots[index] = Some(ItemStack {
                item,
                quantity: portion,
                overrides: overrides.clone(),
            });
            self.touch(index);
            self.record(DeltaKind::Added, item, index, i32::from(portion), portion);
            remaining -= portion;
        }

        Ok(AddOutcome {
            added: quantity - remaining,
            remainder: remaining,
        })
    }

    /// Removes a quantity of one item, all-or-nothing.
    ///
    /// Fails without mutating if the total available is short; otherwise
    /// depletes stacks in ascending slot order, clearing emptied slots.
    pub fn remove(&mut self, item: ItemId, quantity: u16) -> Result<(), SlotError> {
        if quantity == 0 {
            return Ok(());
        }

        let available = self.quantity_of(item);
        if available < u32::from(quantity) {
            return Err(SlotError::InsufficientQuantity {
                item,
                requested: quantity,
                available,
            });
        }

        let mut remaining = quantity;
        for index in 0..self.slots.len() {
            if remaining == 0 {
                break;
            }
            let Some(stack) = self.slots[index].as_mut() else {
                continue;
            };
            if stack.item != item {
                continue;
            }

            let taken = remaining.min(stack.quantity);
            stack.quantity -= taken;
            let new_quantity = stack.quantity;
            remaining -= taken;

            if new_quantity == 0 {
                self.slots[index] = None;
                self.touch(index);
                self.record(DeltaKind::Removed, item, index, -i32::from(taken), 0);
            } else {
                self.touch(index);
                self.record(
                    DeltaKind::QuantityChanged,
                    item,
                    index,
                    -i32::from(taken),
                    new_quantity,
                );
            }
        }

        Ok(())
    }

    /// Moves the stack at `from` onto `to`: relocate into an empty slot,
    /// merge into a compatible stack (remainder stays in the source), or
    /// swap wholesale. Same index is a no-op.
    pub fn move_stack(
        &mut self,
        catalog: &dyn CatalogProvider,
        from: usize,
        to: usize,
    ) -> Result<MoveOutcome, SlotError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(MoveOutcome::NoOp);
        }

        let source = self.slots[from]
            .as_ref()
            .ok_or(SlotError::SlotEmpty { index: from })?;

        match self.slots[to].as_ref() {
            None => {
                let stack = self.slots[from].take().expect("source checked above");
                let item = stack.item;
                let quantity = stack.quantity;
                self.slots[to] = Some(stack);
                self.touch(from);
                self.touch(to);
                self.record(DeltaKind::Removed, item, from, -i32::from(quantity), 0);
                self.record(DeltaKind::Added, item, to, i32::from(quantity), quantity);
                Ok(MoveOutcome::Moved)
            }
            Some(dest) if stacking::can_merge(source, dest) => {
                // Unknown-item stacks (kept through forward-compatible loads)
                // have no stack ceiling to merge under; fall back to a swap.
                let Some(definition) = catalog.lookup(source.item) else {
                    return self.swap_slots(from, to);
                };
                self.merge_slots(from, to, definition.max_stack)
            }
            Some(_) => self.swap_slots(from, to),
        }
    }

    /// Splits `amount` units off the stack at `index` into the first empty
    /// slot, returning the new slot index.
    pub fn split(&mut self, index: usize, amount: u16) -> Result<usize, SlotError> {
        self.check_index(index)?;
        let target = self.first_empty_slot().ok_or(SlotError::NoEmptySlot)?;

        let stack = self.slots[index]
            .as_mut()
            .ok_or(SlotError::SlotEmpty { index })?;
        let item = stack.item;
        let new_stack = stacking::split(stack, amount)?;
        let reduced_quantity = stack.quantity;
        let new_quantity = new_stack.quantity;

        self.slots[target] = Some(new_stack);
        self.touch(index);
        self.touch(target);
        self.record(
            DeltaKind::QuantityChanged,
            item,
            index,
            -i32::from(amount),
            reduced_quantity,
        );
        self.record(DeltaKind::Added, item, target, i32::from(amount), new_quantity);

        Ok(target)
    }

    /// Takes `amount` units out of the stack at `index` as a new stack,
    /// deep-copying overrides. Taking the full quantity clears the slot.
    pub fn take_from_slot(&mut self, index: usize, amount: u16) -> Result<ItemStack, SlotError> {
        self.check_index(index)?;
        let stack = self.slots[index]
            .as_mut()
            .ok_or(SlotError::SlotEmpty { index })?;

        if amount == 0 || amount > stack.quantity {
            return Err(SlotError::InvalidTakeAmount {
                index,
                amount,
                quantity: stack.quantity,
            });
        }

        let item = stack.item;
        if amount == stack.quantity {
            let taken = self.slots[index].take().expect("stack checked above");
            self.touch(index);
            self.record(DeltaKind::Removed, item, index, -i32::from(amount), 0);
            Ok(taken)
        } else {
            stack.quantity -= amount;
            let new_quantity = stack.quantity;
            let taken = ItemStack {
                item,
                quantity: amount,
                overrides: stack.overrides.clone(),
            };
            self.touch(index);
            self.record(
                DeltaKind::QuantityChanged,
                item,
                index,
                -i32::from(amount),
                new_quantity,
            );
            Ok(taken)
        }
    }

    /// Places a whole stack atomically, preferring `preferred` when it can
    /// hold the entire quantity. An out-of-range or unsuitable preference
    /// falls back to the scan. Returns the stack on rejection so the
    /// caller's overflow policy decides its fate.
    pub fn place(
        &mut self,
        catalog: &dyn CatalogProvider,
        stack: ItemStack,
        preferred: Option<usize>,
    ) -> PlaceOutcome {
        if let Some(index) = preferred
            && index < self.slots.len()
            && self.can_absorb(catalog, index, &stack)
        {
            let slot = self.absorb(catalog, index, stack);
            return PlaceOutcome::Placed { slot };
        }

        let candidate = (0..self.slots.len())
            .find(|&index| self.can_absorb(catalog, index, &stack));
        match candidate {
            Some(index) => {
                let slot = self.absorb(catalog, index, stack);
                PlaceOutcome::Placed { slot }
            }
            None => PlaceOutcome::Rejected(stack),
        }
    }

    /// Inverse of [`Self::take_from_slot`] for transaction rollback.
    ///
    /// Returns the taken units to their source slot, merging regardless of
    /// overrides: both halves are the same instance, so recombining them is
    /// not a silent merge of distinct items. Within one coordinator
    /// operation the source slot can only hold the same item or nothing.
    pub(crate) fn give_back(&mut self, index: usize, stack: ItemStack) {
        let item = stack.item;
        let quantity = stack.quantity;
        match self.slots[index].as_mut() {
            None => {
                self.slots[index] = Some(stack);
                self.touch(index);
                self.record(DeltaKind::Added, item, index, i32::from(quantity), quantity);
            }
            Some(existing) if existing.item == item => {
                existing.quantity += quantity;
                let new_quantity = existing.quantity;
                self.touch(index);
                self.record(
                    DeltaKind::QuantityChanged,
                    item,
                    index,
                    i32::from(quantity),
                    new_quantity,
                );
            }
            Some(_) => {
                // Unreachable within a single operation; shunt to the first
                // empty slot rather than lose the stack.
                debug_assert!(false, "give_back target holds a different item");
                if let Some(empty) = self.first_empty_slot() {
                    self.slots[empty] = Some(stack);
                    self.touch(empty);
                    self.record(DeltaKind::Added, item, empty, i32::from(quantity), quantity);
                }
            }
        }
    }

    // ===== internal helpers =====

    fn check_index(&self, index: usize) -> Result<(), SlotError> {
        if index >= self.slots.len() {
            return Err(SlotError::IndexOutOfBounds {
                index,
                capacity: self.slots.len(),
            });
        }
        Ok(())
    }

    /// True if slot `index` can hold the entire incoming stack.
    fn can_absorb(&self, catalog: &dyn CatalogProvider, index: usize, stack: &ItemStack) -> bool {
        match &self.slots[index] {
            None => true,
            Some(dest) => {
                stacking::can_merge(stack, dest)
                    && catalog.lookup(stack.item).is_some_and(|def| {
                        u32::from(dest.quantity) + u32::from(stack.quantity)
                            <= u32::from(def.max_stack)
                    })
            }
        }
    }

    /// Commits a placement previously approved by [`Self::can_absorb`].
    fn absorb(&mut self, catalog: &dyn CatalogProvider, index: usize, stack: ItemStack) -> usize {
        let item = stack.item;
        let quantity = stack.quantity;
        match self.slots[index].as_mut() {
            None => {
                self.slots[index] = Some(stack);
                self.touch(index);
                self.record(DeltaKind::Added, item, index, i32::from(quantity), quantity);
            }
            Some(dest) => {
                let max_stack = catalog
                    .lookup(item)
                    .map(|def| def.max_stack)
                    .unwrap_or(u16::MAX);
                let (accepted, remainder) = stacking::fill(dest, quantity, max_stack);
                debug_assert_eq!(remainder, 0, "absorb called without can_absorb approval");
                let new_quantity = dest.quantity;
                self.touch(index);
                self.record(
                    DeltaKind::QuantityChanged,
                    item,
                    index,
                    i32::from(accepted),
                    new_quantity,
                );
            }
        }
        index
    }

    fn merge_slots(
        &mut self,
        from: usize,
        to: usize,
        max_stack: u16,
    ) -> Result<MoveOutcome, SlotError> {
        let mut source = self.slots[from].take().expect("source checked by caller");
        let dest = self.slots[to].as_mut().expect("dest checked by caller");
        let item = source.item;

        let (accepted, _) = stacking::fill(dest, source.quantity, max_stack);
        let dest_quantity = dest.quantity;
        source.quantity -= accepted;

        if accepted > 0 {
            self.touch(to);
            self.record(
                DeltaKind::QuantityChanged,
                item,
                to,
                i32::from(accepted),
                dest_quantity,
            );
        }

        if source.quantity == 0 {
            self.touch(from);
            self.record(DeltaKind::Removed, item, from, -i32::from(accepted), 0);
        } else {
            let source_quantity = source.quantity;
            self.slots[from] = Some(source);
            if accepted > 0 {
                self.touch(from);
                self.record(
                    DeltaKind::QuantityChanged,
                    item,
                    from,
                    -i32::from(accepted),
                    source_quantity,
                );
            }
        }

        Ok(MoveOutcome::Merged {
            transferred: accepted,
        })
    }

    fn swap_slots(&mut self, from: usize, to: usize) -> Result<MoveOutcome, SlotError> {
        let a = self.slots[from].take().expect("source checked by caller");
        let b = self.slots[to].take().expect("dest checked by caller");

        self.record(DeltaKind::Removed, a.item, from, -i32::from(a.quantity), 0);
        self.record(DeltaKind::Removed, b.item, to, -i32::from(b.quantity), 0);
        self.record(DeltaKind::Added, b.item, from, i32::from(b.quantity), b.quantity);
        self.record(DeltaKind::Added, a.item, to, i32::from(a.quantity), a.quantity);

        self.slots[from] = Some(b);
        self.slots[to] = Some(a);
        self.touch(from);
        self.touch(to);

        Ok(MoveOutcome::Swapped)
    }

    fn touch(&mut self, index: usize) {
        self.versions[index] += 1;
    }

    fn record(
        &mut self,
        kind: DeltaKind,
        item: ItemId,
        slot: usize,
        quantity_change: i32,
        new_quantity: u16,
    ) {
        self.deltas.push(SlotDelta {
            kind,
            item,
            slot,
            quantity_change,
            new_quantity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ItemCatalog, ItemCategory, ItemDefinition};

    const POTION: ItemId = ItemId(1);
    const SWORD: ItemId = ItemId(2);

    fn catalog() -> ItemCatalog {
        ItemCatalog::new(
            [
                ItemDefinition::new(POTION, "potion", ItemCategory::Consumable)
                    .with_max_stack(99),
                ItemDefinition::new(SWORD, "sword", ItemCategory::Weapon),
            ],
            [],
        )
    }

    fn store(capacity: usize) -> SlotStore {
        SlotStore::new(capacity).unwrap()
    }

    #[test]
    fn add_fills_99_99_52_across_empty_store() {
        let catalog = catalog();
        let mut slots = store(30);

        let outcome = slots.add(&catalog, POTION, 250, None).unwrap();
        assert_eq!(outcome, AddOutcome { added: 250, remainder: 0 });

        let quantities: Vec<u16> = slots.occupied().map(|(_, s)| s.quantity).collect();
        assert_eq!(quantities, vec![99, 99, 52]);
        assert_eq!(slots.quantity_of(POTION), 250);
    }

    #[test]
    fn add_tops_up_before_allocating() {
        let catalog = catalog();
        let mut slots = store(30);
        slots.add(&catalog, POTION, 90, None).unwrap();
        slots.add(&catalog, SWORD, 1, None).unwrap();

        slots.add(&catalog, POTION, 20, None).unwrap();
        assert_eq!(slots.get(0).unwrap().quantity, 99); // topped up first
        assert_eq!(slots.get(2).unwrap().quantity, 11); // remainder in a new slot
    }

    #[test]
    fn add_into_full_store_reports_remainder_without_mutation() {
        let catalog = catalog();
        let mut slots = store(2);
        slots.add(&catalog, SWORD, 1, None).unwrap();
        slots.add(&catalog, SWORD, 1, None).unwrap();
        slots.drain_deltas();

        let outcome = slots.add(&catalog, SWORD, 1, None).unwrap();
        assert_eq!(outcome, AddOutcome { added: 0, remainder: 1 });
        assert_eq!(slots.quantity_of(SWORD), 2);
        assert!(slots.drain_deltas().is_empty());
    }

    #[test]
    fn add_unknown_item_is_rejected() {
        let catalog = catalog();
        let mut slots = store(4);
        assert!(matches!(
            slots.add(&catalog, ItemId(404), 1, None),
            Err(SlotError::UnknownItem(_))
        ));
    }

    #[test]
    fn overridden_quantities_never_top_up_plain_stacks() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 10, None).unwrap();

        let overrides = StackOverrides {
            stats: vec![],
            affixes: vec![crate::catalog::AffixId(1)],
        };
        slots.add(&catalog, POTION, 5, Some(overrides)).unwrap();

        assert_eq!(slots.get(0).unwrap().quantity, 10);
        assert_eq!(slots.get(1).unwrap().quantity, 5);
    }

    #[test]
    fn remove_is_all_or_nothing() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 120, None).unwrap();

        let err = slots.remove(POTION, 200).unwrap_err();
        assert!(matches!(err, SlotError::InsufficientQuantity { available: 120, .. }));
        assert_eq!(slots.quantity_of(POTION), 120);

        slots.remove(POTION, 120).unwrap();
        assert_eq!(slots.quantity_of(POTION), 0);
        assert_eq!(slots.first_empty_slot(), Some(0));
    }

    #[test]
    fn remove_depletes_ascending_and_clears_emptied_slots() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 150, None).unwrap(); // 99 / 51

        slots.remove(POTION, 100).unwrap();
        assert!(slots.get(0).is_none()); // slot 0 fully depleted
        assert_eq!(slots.get(1).unwrap().quantity, 50);
    }

    #[test]
    fn move_into_empty_slot_relocates() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, SWORD, 1, None).unwrap();

        assert_eq!(slots.move_stack(&catalog, 0, 3).unwrap(), MoveOutcome::Moved);
        assert!(slots.get(0).is_none());
        assert_eq!(slots.get(3).unwrap().item, SWORD);
    }

    #[test]
    fn move_onto_compatible_stack_merges_with_remainder_in_source() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 99, None).unwrap();
        slots.add(&catalog, POTION, 50, None).unwrap(); // slot 0 full, slot 1 = 50
        slots.remove(POTION, 40).unwrap(); // depletes ascending: slot 0 -> 59
        assert_eq!(slots.get(0).unwrap().quantity, 59);

        let outcome = slots.move_stack(&catalog, 1, 0).unwrap();
        assert_eq!(outcome, MoveOutcome::Merged { transferred: 40 });
        assert_eq!(slots.get(0).unwrap().quantity, 99);
        assert_eq!(slots.get(1).unwrap().quantity, 10); // remainder stays in source
    }

    #[test]
    fn move_onto_incompatible_stack_swaps() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 10, None).unwrap();
        slots.add(&catalog, SWORD, 1, None).unwrap();

        assert_eq!(slots.move_stack(&catalog, 0, 1).unwrap(), MoveOutcome::Swapped);
        assert_eq!(slots.get(0).unwrap().item, SWORD);
        assert_eq!(slots.get(1).unwrap().item, POTION);
    }

    #[test]
    fn move_same_index_is_a_no_op() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 10, None).unwrap();
        slots.drain_deltas();

        assert_eq!(slots.move_stack(&catalog, 0, 0).unwrap(), MoveOutcome::NoOp);
        assert!(slots.drain_deltas().is_empty());
    }

    #[test]
    fn split_lands_in_first_empty_slot() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 50, None).unwrap();

        let target = slots.split(0, 20).unwrap();
        assert_eq!(target, 1);
        assert_eq!(slots.get(0).unwrap().quantity, 30);
        assert_eq!(slots.get(1).unwrap().quantity, 20);
    }

    #[test]
    fn split_without_empty_slot_fails_cleanly() {
        let catalog = catalog();
        let mut slots = store(2);
        slots.add(&catalog, POTION, 50, None).unwrap();
        slots.add(&catalog, SWORD, 1, None).unwrap();

        assert!(matches!(slots.split(0, 20), Err(SlotError::NoEmptySlot)));
        assert_eq!(slots.get(0).unwrap().quantity, 50);
    }

    #[test]
    fn split_invalid_amount_fails_cleanly() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 10, None).unwrap();

        assert!(matches!(
            slots.split(0, 10),
            Err(SlotError::Split(SplitError::InvalidAmount { .. }))
        ));
    }

    #[test]
    fn take_partial_leaves_reduced_stack() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 10, None).unwrap();

        let taken = slots.take_from_slot(0, 1).unwrap();
        assert_eq!(taken.quantity, 1);
        assert_eq!(slots.get(0).unwrap().quantity, 9);

        let rest = slots.take_from_slot(0, 9).unwrap();
        assert_eq!(rest.quantity, 9);
        assert!(slots.get(0).is_none());
    }

    #[test]
    fn place_prefers_the_requested_slot() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 10, None).unwrap();

        let outcome = slots.place(&catalog, ItemStack::new(SWORD, 1), Some(2));
        assert_eq!(outcome, PlaceOutcome::Placed { slot: 2 });
    }

    #[test]
    fn place_merges_into_preferred_stack_when_it_fits() {
        let catalog = catalog();
        let mut slots = store(4);
        slots.add(&catalog, POTION, 10, None).unwrap();

        let outcome = slots.place(&catalog, ItemStack::new(POTION, 5), Some(0));
        assert_eq!(outcome, PlaceOutcome::Placed { slot: 0 });
        assert_eq!(slots.get(0).unwrap().quantity, 15);
    }

    #[test]
    fn place_rejects_when_nothing_fits() {
        let catalog = catalog();
        let mut slots = store(1);
        slots.add(&catalog, SWORD, 1, None).unwrap();

        let outcome = slots.place(&catalog, ItemStack::new(POTION, 5), None);
        assert!(matches!(outcome, PlaceOutcome::Rejected(stack) if stack.quantity == 5));
        assert_eq!(slots.quantity_of(POTION), 0);
    }

    #[test]
    fn versions_increase_monotonically_per_slot() {
        let catalog = catalog();
        let mut slots = store(4);
        assert_eq!(slots.version(0), Some(0));

        slots.add(&catalog, POTION, 10, None).unwrap();
        let v1 = slots.version(0).unwrap();
        assert!(v1 > 0);

        slots.remove(POTION, 5).unwrap();
        assert!(slots.version(0).unwrap() > v1);
        assert_eq!(slots.version(1), Some(0)); // untouched slot keeps its version
    }

    #[test]
    fn quantity_is_conserved_by_move_and_split() {
        let catalog = catalog();
        let mut slots = store(8);
        slots.add(&catalog, POTION, 120, None).unwrap();

        slots.split(0, 30).unwrap();
        slots.move_stack(&catalog, 1, 4).unwrap();
        slots.move_stack(&catalog, 4, 2).unwrap();
        slots.split(2, 5).unwrap();

        assert_eq!(slots.quantity_of(POTION), 120);
    }

    #[test]
    fn from_records_rejects_out_of_range_and_duplicates() {
        let records = vec![(2usize, ItemStack::new(POTION, 5))];
        assert!(SlotStore::from_records(2, records).is_err());

        let records = vec![
            (0usize, ItemStack::new(POTION, 5)),
            (0usize, ItemStack::new(SWORD, 1)),
        ];
        assert!(matches!(
            SlotStore::from_records(2, records),
            Err(SlotError::DuplicateRecord { index: 0 })
        ));
    }
}

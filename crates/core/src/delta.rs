//! Incremental change records for inventory slots.
//!
//! Every slot mutation produces a [`SlotDelta`]; the persistence layer drains
//! them into a [`DeltaBatch`] and flushes the batch alongside each save.
//! Batches coalesce: several mutations of the same (slot, item) pair inside
//! one debounce window collapse into a single net record.

use crate::catalog::ItemId;

/// Kind of change applied to one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeltaKind {
    /// A stack appeared in a previously empty slot.
    Added,
    /// The stack in the slot was destroyed.
    Removed,
    /// The stack's quantity changed in place.
    QuantityChanged,
}

/// One incremental change record.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotDelta {
    pub kind: DeltaKind,
    pub item: ItemId,
    pub slot: usize,
    /// Signed net quantity change (negative for removals).
    pub quantity_change: i32,
    /// Quantity in the slot after the change (0 for removals).
    pub new_quantity: u16,
}

/// An accumulated batch of slot deltas, coalesced per (slot, item) pair.
///
/// # Coalescing
///
/// Merging a new record into an existing one for the same slot and item
/// follows the net-effect rules:
///
/// | existing           | incoming          | result                   |
/// |--------------------|-------------------|--------------------------|
/// | Added              | QuantityChanged   | Added (updated quantity) |
/// | Added              | Removed           | record dropped           |
/// | QuantityChanged    | QuantityChanged   | summed; dropped if net 0 |
/// | QuantityChanged    | Removed           | Removed                  |
/// | Removed            | Added             | QuantityChanged (net)    |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeltaBatch {
    entries: Vec<SlotDelta>,
}

impl DeltaBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a delta, coalescing with an existing record for the same
    /// (slot, item) pair.
    pub fn push(&mut self, delta: SlotDelta) {
        let Some(index) = self
            .entries
            .iter()
            .position(|e| e.slot == delta.slot && e.item == delta.item)
        else {
            self.entries.push(delta);
            return;
        };

        let existing = &mut self.entries[index];
        let net_change = existing.quantity_change + delta.quantity_change;

        let merged_kind = match (existing.kind, delta.kind) {
            (DeltaKind::Added, DeltaKind::QuantityChanged) => Some(DeltaKind::Added),
            (DeltaKind::Added, DeltaKind::Removed) => None,
            (DeltaKind::QuantityChanged, DeltaKind::QuantityChanged) => {
                if net_change == 0 {
                    None
                } else {
                    Some(DeltaKind::QuantityChanged)
                }
            }
            (DeltaKind::QuantityChanged, DeltaKind::Removed) => Some(DeltaKind::Removed),
            (DeltaKind::Removed, DeltaKind::Added) => {
                if net_change == 0 {
                    None
                } else {
                    Some(DeltaKind::QuantityChanged)
                }
            }
            // Same-kind repeats and the remaining pairs cannot be produced by
            // a well-formed mutation sequence; keep the latest record.
            _ => Some(delta.kind),
        };

        match merged_kind {
            Some(kind) => {
                existing.kind = kind;
                existing.quantity_change = net_change;
                existing.new_quantity = delta.new_quantity;
            }
            None => {
                self.entries.remove(index);
            }
        }
    }

    /// Merges another batch into this one, entry by entry.
    pub fn merge(&mut self, other: DeltaBatch) {
        for delta in other.entries {
            self.push(delta);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[SlotDelta] {
        &self.entries
    }

    /// Takes all accumulated entries, leaving the batch empty.
    pub fn take(&mut self) -> DeltaBatch {
        DeltaBatch {
            entries: core::mem::take(&mut self.entries),
        }
    }
}

impl IntoIterator for DeltaBatch {
    type Item = SlotDelta;
    type IntoIter = std::vec::IntoIter<SlotDelta>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(kind: DeltaKind, slot: usize, change: i32, new_quantity: u16) -> SlotDelta {
        SlotDelta {
            kind,
            item: ItemId(1),
            slot,
            quantity_change: change,
            new_quantity,
        }
    }

    #[test]
    fn add_then_top_up_stays_added() {
        let mut batch = DeltaBatch::new();
        batch.push(delta(DeltaKind::Added, 0, 10, 10));
        batch.push(delta(DeltaKind::QuantityChanged, 0, 5, 15));

        assert_eq!(batch.len(), 1);
        let entry = &batch.entries()[0];
        assert_eq!(entry.kind, DeltaKind::Added);
        assert_eq!(entry.quantity_change, 15);
        assert_eq!(entry.new_quantity, 15);
    }

    #[test]
    fn add_then_remove_cancels_out() {
        let mut batch = DeltaBatch::new();
        batch.push(delta(DeltaKind::Added, 0, 10, 10));
        batch.push(delta(DeltaKind::Removed, 0, -10, 0));
        assert!(batch.is_empty());
    }

    #[test]
    fn opposite_quantity_changes_cancel_out() {
        let mut batch = DeltaBatch::new();
        batch.push(delta(DeltaKind::QuantityChanged, 2, 4, 14));
        batch.push(delta(DeltaKind::QuantityChanged, 2, -4, 10));
        assert!(batch.is_empty());
    }

    #[test]
    fn remove_then_add_becomes_net_change() {
        let mut batch = DeltaBatch::new();
        batch.push(delta(DeltaKind::Removed, 1, -10, 0));
        batch.push(delta(DeltaKind::Added, 1, 4, 4));

        let entry = &batch.entries()[0];
        assert_eq!(entry.kind, DeltaKind::QuantityChanged);
        assert_eq!(entry.quantity_change, -6);
        assert_eq!(entry.new_quantity, 4);
    }

    #[test]
    fn distinct_slots_do_not_coalesce() {
        let mut batch = DeltaBatch::new();
        batch.push(delta(DeltaKind::Added, 0, 1, 1));
        batch.push(delta(DeltaKind::Added, 1, 1, 1));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn merge_unions_two_bursts() {
        let mut first = DeltaBatch::new();
        first.push(delta(DeltaKind::Added, 0, 10, 10));

        let mut second = DeltaBatch::new();
        second.push(delta(DeltaKind::QuantityChanged, 0, 5, 15));
        second.push(delta(DeltaKind::Added, 3, 1, 1));

        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.entries()[0].new_quantity, 15);
    }
}

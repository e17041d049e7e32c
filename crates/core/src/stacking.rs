//! Stack instances and the pure merge/split/fill rules.
//!
//! Everything here is arithmetic over one or two stacks; slot placement and
//! catalog lookups live in [`crate::slots`].

use crate::catalog::{AffixId, ItemId};
use crate::error::{CoreError, ErrorSeverity};
use crate::stats::StatLine;

/// Per-instance customization carried by a stack (enchants, rerolled stats).
///
/// A stack with overrides never silently merges with a plain one; both halves
/// of a split receive independent deep copies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackOverrides {
    /// Extra stat lines applied on top of the definition's base stats.
    pub stats: Vec<StatLine>,
    /// Instance affixes applied in addition to the definition's innate ones.
    pub affixes: Vec<AffixId>,
}

impl StackOverrides {
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.affixes.is_empty()
    }
}

/// Mutable runtime instance of an item: a quantity of one definition.
///
/// A stack is owned exclusively by one inventory slot or one equipment
/// socket, never both, and is destroyed when its quantity reaches 0. The
/// stack references its definition by id; it never owns catalog data.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemStack {
    pub item: ItemId,
    pub quantity: u16,
    #[cfg_attr(feature = "serde", serde(default))]
    pub overrides: Option<StackOverrides>,
}

impl ItemStack {
    pub fn new(item: ItemId, quantity: u16) -> Self {
        Self {
            item,
            quantity,
            overrides: None,
        }
    }

    pub fn with_overrides(item: ItemId, quantity: u16, overrides: StackOverrides) -> Self {
        Self {
            item,
            quantity,
            overrides: Some(overrides),
        }
    }

    /// Returns true if the stack carries no per-instance customization.
    pub fn is_plain(&self) -> bool {
        self.overrides.as_ref().is_none_or(StackOverrides::is_empty)
    }
}

/// Errors raised by [`split`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitError {
    /// The requested amount must satisfy `0 < amount < quantity`.
    #[error("cannot split {amount} out of a stack of {quantity}")]
    InvalidAmount { amount: u16, quantity: u16 },
}

impl CoreError for SplitError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            SplitError::InvalidAmount { .. } => "STACK_SPLIT_INVALID_AMOUNT",
        }
    }
}

/// Tops up `stack` from an incoming quantity, bounded by the stack ceiling.
///
/// Returns `(accepted, remainder)` where
/// `accepted = min(incoming, max_stack - stack.quantity)`. The remainder is
/// never discarded; the caller decides the overflow policy.
pub fn fill(stack: &mut ItemStack, incoming: u16, max_stack: u16) -> (u16, u16) {
    let headroom = max_stack.saturating_sub(stack.quantity);
    let accepted = incoming.min(headroom);
    stack.quantity += accepted;
    (accepted, incoming - accepted)
}

/// Returns true iff two stacks may be combined.
///
/// Same item id AND neither side carries per-instance overrides: modified
/// items never silently combine with plain ones (or with each other).
pub fn can_merge(a: &ItemStack, b: &ItemStack) -> bool {
    a.item == b.item && a.is_plain() && b.is_plain()
}

/// Splits `amount` units off `stack`, returning the new stack.
///
/// Requires `0 < amount < quantity`; fails without mutating otherwise. The
/// new stack deep-copies all overrides so both halves are independently
/// mutable.
pub fn split(stack: &mut ItemStack, amount: u16) -> Result<ItemStack, SplitError> {
    if amount == 0 || amount >= stack.quantity {
        return Err(SplitError::InvalidAmount {
            amount,
            quantity: stack.quantity,
        });
    }

    stack.quantity -= amount;
    Ok(ItemStack {
        item: stack.item,
        quantity: amount,
        overrides: stack.overrides.clone(),
    })
}

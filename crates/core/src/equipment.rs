//! Named equipment sockets and category compatibility.
//!
//! Each socket is `{Empty} <-equip-> {Occupied}` holding at most one
//! quantity-1 stack. Socket names are a closed enum, so an unknown socket is
//! unrepresentable past the string-parsing boundary; category compatibility
//! is checked against a per-socket bitflags set before any mutation.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::catalog::{CatalogProvider, ItemCategory, ItemId};
use crate::error::{CoreError, ErrorSeverity};
use crate::stacking::ItemStack;

bitflags! {
    /// Set of item categories accepted by a socket.
    ///
    /// One bit per [`ItemCategory`]; O(1) membership checks and a minimal
    /// footprint for the per-socket compatibility tables.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CategorySet: u16 {
        const WEAPON     = 1 << 0;
        const SHIELD     = 1 << 1;
        const HELMET     = 1 << 2;
        const ARMOR      = 1 << 3;
        const RING       = 1 << 4;
        const BODY       = 1 << 5;
        const BOOTS      = 1 << 6;
        const CLOTH      = 1 << 7;
        const BACK       = 1 << 8;
        const PET        = 1 << 9;
        const CONSUMABLE = 1 << 10;
        const MATERIAL   = 1 << 11;
    }
}

impl From<ItemCategory> for CategorySet {
    fn from(category: ItemCategory) -> Self {
        match category {
            ItemCategory::Weapon => Self::WEAPON,
            ItemCategory::Shield => Self::SHIELD,
            ItemCategory::Helmet => Self::HELMET,
            ItemCategory::Armor => Self::ARMOR,
            ItemCategory::Ring => Self::RING,
            ItemCategory::Body => Self::BODY,
            ItemCategory::Boots => Self::BOOTS,
            ItemCategory::Cloth => Self::CLOTH,
            ItemCategory::Back => Self::BACK,
            ItemCategory::Pet => Self::PET,
            ItemCategory::Consumable => Self::CONSUMABLE,
            ItemCategory::Material => Self::MATERIAL,
        }
    }
}

/// Fixed, named equipment socket.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SocketId {
    WeaponL,
    WeaponR,
    Helmet,
    Armor,
    RingL,
    RingR,
    Body,
    Foot,
    Cloth,
    Back,
    Pet,
}

impl SocketId {
    /// Every socket, in display order.
    pub const ALL: [SocketId; 11] = [
        SocketId::WeaponL,
        SocketId::WeaponR,
        SocketId::Helmet,
        SocketId::Armor,
        SocketId::RingL,
        SocketId::RingR,
        SocketId::Body,
        SocketId::Foot,
        SocketId::Cloth,
        SocketId::Back,
        SocketId::Pet,
    ];

    /// Item categories this socket accepts.
    pub fn allowed(self) -> CategorySet {
        match self {
            // Off-hand additionally takes shields
            SocketId::WeaponL => CategorySet::WEAPON | CategorySet::SHIELD,
            SocketId::WeaponR => CategorySet::WEAPON,
            SocketId::Helmet => CategorySet::HELMET,
            SocketId::Armor => CategorySet::ARMOR,
            SocketId::RingL | SocketId::RingR => CategorySet::RING,
            SocketId::Body => CategorySet::BODY,
            SocketId::Foot => CategorySet::BOOTS,
            SocketId::Cloth => CategorySet::CLOTH,
            SocketId::Back => CategorySet::BACK,
            SocketId::Pet => CategorySet::PET,
        }
    }

    /// True if items of `category` may occupy this socket.
    pub fn accepts(self, category: ItemCategory) -> bool {
        self.allowed().contains(category.into())
    }
}

/// Errors that occur during equipment operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EquipError {
    /// The item id has no catalog definition.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    /// The item's category is not in the socket's allowed set.
    #[error("item {item} ({category}) does not fit socket {socket}")]
    CategoryMismatch {
        item: ItemId,
        category: ItemCategory,
        socket: SocketId,
    },

    /// Equipped stacks are always singleton.
    #[error("cannot equip a stack of {quantity} (sockets hold exactly 1)")]
    NotSingleton { quantity: u16 },
}

impl CoreError for EquipError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        use EquipError::*;
        match self {
            UnknownItem(_) => "EQUIP_UNKNOWN_ITEM",
            CategoryMismatch { .. } => "EQUIP_CATEGORY_MISMATCH",
            NotSingleton { .. } => "EQUIP_NOT_SINGLETON",
        }
    }
}

/// A rejected equip, handing the offered stack back to the caller.
///
/// Equip consumes the stack on success; on rejection ownership must return
/// to the caller so the item is never lost.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct EquipRejected {
    pub stack: ItemStack,
    pub error: EquipError,
}

/// Fixed set of named sockets for one entity.
///
/// The controller validates socket/category compatibility; cross-component
/// flows (returning a displaced occupant to the inventory, refreshing stat
/// projections) belong to the transaction coordinator.
#[derive(Clone, Debug, Default)]
pub struct EquipmentController {
    sockets: BTreeMap<SocketId, ItemStack>,
}

impl EquipmentController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a controller from a persisted socket map.
    ///
    /// Occupants are taken as-is; items whose definitions are missing from
    /// the current catalog are kept (forward compatibility) and surfaced via
    /// [`Self::unknown_occupants`].
    pub fn from_sockets(sockets: BTreeMap<SocketId, ItemStack>) -> Self {
        Self { sockets }
    }

    /// Validates an equip without mutating: socket compatibility, catalog
    /// presence, and the singleton rule.
    pub fn check(
        &self,
        catalog: &dyn CatalogProvider,
        stack: &ItemStack,
        socket: SocketId,
    ) -> Result<(), EquipError> {
        if stack.quantity != 1 {
            return Err(EquipError::NotSingleton {
                quantity: stack.quantity,
            });
        }
        let definition = catalog
            .lookup(stack.item)
            .ok_or(EquipError::UnknownItem(stack.item))?;
        if !socket.accepts(definition.category) {
            return Err(EquipError::CategoryMismatch {
                item: stack.item,
                category: definition.category,
                socket,
            });
        }
        Ok(())
    }

    /// Equips a stack, returning the previous occupant if any.
    ///
    /// Validate-then-commit: on rejection the socket is untouched and the
    /// offered stack comes back inside the error.
    pub fn equip(
        &mut self,
        catalog: &dyn CatalogProvider,
        stack: ItemStack,
        socket: SocketId,
    ) -> Result<Option<ItemStack>, EquipRejected> {
        if let Err(error) = self.check(catalog, &stack, socket) {
            return Err(EquipRejected { stack, error });
        }
        Ok(self.sockets.insert(socket, stack))
    }

    /// Reinserts a stack that previously occupied `socket`, bypassing
    /// validation. Rollback-only path for the transaction coordinator.
    pub(crate) fn restore(&mut self, socket: SocketId, stack: ItemStack) {
        self.sockets.insert(socket, stack);
    }

    /// Unequips the socket's occupant, returning it if any was equipped.
    pub fn unequip(&mut self, socket: SocketId) -> Option<ItemStack> {
        self.sockets.remove(&socket)
    }

    /// Swaps the contents of two sockets.
    ///
    /// Both legs are validated before either is mutated: a mismatch aborts
    /// with zero observable change. One-sided swaps move the single occupant
    /// if the destination accepts it.
    pub fn swap(
        &mut self,
        catalog: &dyn CatalogProvider,
        socket_a: SocketId,
        socket_b: SocketId,
    ) -> Result<(), EquipError> {
        if socket_a == socket_b {
            return Ok(());
        }

        // Validate both legs first.
        for (stack, target) in [
            (self.sockets.get(&socket_a), socket_b),
            (self.sockets.get(&socket_b), socket_a),
        ] {
            if let Some(stack) = stack {
                self.check(catalog, stack, target)?;
            }
        }

        let a = self.sockets.remove(&socket_a);
        let b = self.sockets.remove(&socket_b);
        if let Some(stack) = a {
            self.sockets.insert(socket_b, stack);
        }
        if let Some(stack) = b {
            self.sockets.insert(socket_a, stack);
        }
        Ok(())
    }

    /// Current occupant of a socket.
    pub fn occupant(&self, socket: SocketId) -> Option<&ItemStack> {
        self.sockets.get(&socket)
    }

    pub fn is_occupied(&self, socket: SocketId) -> bool {
        self.sockets.contains_key(&socket)
    }

    /// Iterates occupied sockets in socket order.
    pub fn occupied(&self) -> impl Iterator<Item = (SocketId, &ItemStack)> {
        self.sockets.iter().map(|(socket, stack)| (*socket, stack))
    }

    /// Snapshot of the socket map for persistence.
    pub fn to_sockets(&self) -> BTreeMap<SocketId, ItemStack> {
        self.sockets.clone()
    }

    /// Occupants whose item ids are missing from the catalog.
    pub fn unknown_occupants(&self, catalog: &dyn CatalogProvider) -> Vec<ItemId> {
        self.sockets
            .values()
            .filter(|stack| catalog.lookup(stack.item).is_none())
            .map(|stack| stack.item)
            .collect()
    }

    /// Total quantity of `item` across all sockets.
    pub fn quantity_of(&self, item: ItemId) -> u32 {
        self.sockets
            .values()
            .filter(|stack| stack.item == item)
            .map(|stack| u32::from(stack.quantity))
            .sum()
    }
}

//! Read-only item definition registry.
//!
//! The catalog maps item ids to immutable [`ItemDefinition`]s loaded once at
//! startup. Collaborators receive it through the [`CatalogProvider`] trait so
//! they stay decoupled from the concrete loading mechanism.

use std::collections::HashMap;

use crate::stats::StatLine;

/// Reference to an item definition stored in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u32);

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "item:{}", self.0)
    }
}

/// Reference to an affix definition stored in the catalog.
///
/// Affixes are resolved lazily at stat projection time; an id with no
/// matching definition is ignored (and surfaced for a warning log), never
/// fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffixId(pub u32);

impl core::fmt::Display for AffixId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "affix:{}", self.0)
    }
}

/// Gameplay classification of an item.
///
/// Category drives socket compatibility (see
/// [`CategorySet`](crate::equipment::CategorySet)) and which optional payload
/// fields of [`ItemDefinition`] are meaningful.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ItemCategory {
    /// Main-hand or off-hand weapon
    Weapon,
    /// Off-hand shield
    Shield,
    /// Head armor
    Helmet,
    /// Torso armor
    Armor,
    /// Finger jewelry
    Ring,
    /// Full-body garment
    Body,
    /// Footwear
    Boots,
    /// Clothing layer
    Cloth,
    /// Back-slot gear (cape, quiver)
    Back,
    /// Companion creature
    Pet,
    /// Usable item (potion, scroll, food)
    Consumable,
    /// Crafting or quest material, never equipped or used
    #[default]
    Material,
}

impl ItemCategory {
    /// Returns true if items of this category can occupy an equipment socket.
    pub const fn is_equippable(self) -> bool {
        !matches!(self, Self::Consumable | Self::Material)
    }
}

/// Item rarity tier.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Elemental alignment of an item.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Element {
    #[default]
    None,
    Fire,
    Water,
    Earth,
    Wind,
    Light,
    Dark,
}

/// Effect applied when a consumable item is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UseEffect {
    /// Restore health.
    Heal(u16),

    /// Restore mana.
    RestoreMana(u16),

    /// Teleport to a bound location.
    Teleport,

    /// Custom effect resolved by the host.
    Custom(u16),
}

/// Item definition with common fields and category-specific payloads.
///
/// # Design: Base + Category Pattern
///
/// - The base struct holds the fields every item shares (id, rarity, stacking)
/// - `category` classifies the item; optional payloads (`base_stats`,
///   `use_effect`) are meaningful only for the categories that match them
/// - Consumers match on `category` explicitly where behavior differs; there is
///   no subtype hierarchy
///
/// # Stacking
///
/// All items have a `max_stack` value:
/// - Equipment: max_stack=1 (cannot stack)
/// - Consumables/materials: max_stack up to 99 (stackable)
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    pub category: ItemCategory,
    pub rarity: Rarity,
    pub element: Element,
    /// Minimum owner level required to equip or use the item.
    pub level_requirement: u16,
    pub max_stack: u16,
    /// Stat contributions while equipped. Empty for non-equipment.
    pub base_stats: Vec<StatLine>,
    /// Innate affixes, resolved against the catalog's affix table.
    pub affixes: Vec<AffixId>,
    /// Present only for consumables.
    pub use_effect: Option<UseEffect>,
}

impl ItemDefinition {
    pub fn new(id: ItemId, name: impl Into<String>, category: ItemCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            rarity: Rarity::Common,
            element: Element::None,
            level_requirement: 0,
            max_stack: 1,
            base_stats: Vec::new(),
            affixes: Vec::new(),
            use_effect: None,
        }
    }

    /// Sets the stack ceiling (builder pattern).
    #[must_use]
    pub fn with_max_stack(mut self, max_stack: u16) -> Self {
        self.max_stack = max_stack;
        self
    }

    /// Sets the stat contributions while equipped (builder pattern).
    #[must_use]
    pub fn with_base_stats(mut self, base_stats: Vec<StatLine>) -> Self {
        self.base_stats = base_stats;
        self
    }

    /// Sets the innate affixes (builder pattern).
    #[must_use]
    pub fn with_affixes(mut self, affixes: Vec<AffixId>) -> Self {
        self.affixes = affixes;
        self
    }

    /// Sets the use effect (builder pattern).
    #[must_use]
    pub fn with_use_effect(mut self, effect: UseEffect) -> Self {
        self.use_effect = Some(effect);
        self
    }

    /// Sets rarity and element (builder pattern).
    #[must_use]
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }
}

/// Stat contribution of one affix.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffixDefinition {
    pub id: AffixId,
    pub name: String,
    pub line: StatLine,
}

/// Read-only access to item and affix definitions.
///
/// Supplied to every component at construction; an unknown id is a lookup
/// miss, never a panic.
pub trait CatalogProvider {
    fn lookup(&self, id: ItemId) -> Option<&ItemDefinition>;

    fn affix(&self, id: AffixId) -> Option<&AffixDefinition>;
}

/// In-memory id→definition registry. Loaded once, read-only thereafter.
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    items: HashMap<ItemId, ItemDefinition>,
    affixes: HashMap<AffixId, AffixDefinition>,
}

impl ItemCatalog {
    pub fn new(
        items: impl IntoIterator<Item = ItemDefinition>,
        affixes: impl IntoIterator<Item = AffixDefinition>,
    ) -> Self {
        Self {
            items: items.into_iter().map(|def| (def.id, def)).collect(),
            affixes: affixes.into_iter().map(|def| (def.id, def)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates all item definitions in unspecified order.
    pub fn definitions(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }
}

impl CatalogProvider for ItemCatalog {
    fn lookup(&self, id: ItemId) -> Option<&ItemDefinition> {
        self.items.get(&id)
    }

    fn affix(&self, id: AffixId) -> Option<&AffixDefinition> {
        self.affixes.get(&id)
    }
}

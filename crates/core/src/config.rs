/// Inventory configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InventoryConfig {
    /// Number of addressable inventory slots for one entity.
    /// Must not exceed [`InventoryConfig::MAX_SLOTS`].
    pub capacity: usize,

    /// Idle interval after the last mutation before a save fires, in
    /// milliseconds. Bursts of mutations inside this window coalesce into
    /// one write.
    pub save_debounce_ms: u64,
}

impl InventoryConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum number of inventory slots any entity can be configured with.
    pub const MAX_SLOTS: usize = 64;
    /// Maximum number of affixes carried by one item definition or override.
    pub const MAX_AFFIXES: usize = 8;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_CAPACITY: usize = 30;
    pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 40;

    pub fn new() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            save_debounce_ms: Self::DEFAULT_SAVE_DEBOUNCE_MS,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::new()
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

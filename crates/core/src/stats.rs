//! Stat modifiers projected from equipped items.
//!
//! The projector owns every [`StatModifier`] derived from equipment. Each
//! modifier is tagged with its source socket so the whole batch for one
//! socket can be atomically replaced when that socket changes; recomputation
//! cost is O(sockets changed), never O(all sockets).
//!
//! Aggregation follows the bonus-stack order: flat additions are summed
//! first, then summed percent increases are applied, then the result is
//! clamped.

use crate::catalog::{AffixId, CatalogProvider};
use crate::equipment::SocketId;
use crate::stacking::ItemStack;

/// Identifier of one character statistic.
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
pub enum StatId {
    Attack,
    Defense,
    MaxHp,
    MaxMp,
    Strength,
    Agility,
    Intellect,
    CritRate,
    MoveSpeed,
}

/// One stat contribution: a flat addition and a percent increase.
///
/// Percent values are stored as integer percentages (e.g., 20 = +20%).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatLine {
    pub stat: StatId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub flat: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub percent: i32,
}

impl StatLine {
    pub fn new(stat: StatId, flat: i32, percent: i32) -> Self {
        Self { stat, flat, percent }
    }

    /// A pure flat contribution.
    pub fn flat(stat: StatId, flat: i32) -> Self {
        Self::new(stat, flat, 0)
    }

    /// A pure percent contribution (20 = +20%).
    pub fn percent(stat: StatId, percent: i32) -> Self {
        Self::new(stat, 0, percent)
    }
}

/// A registered modifier: one stat line plus the socket that sourced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatModifier {
    pub stat: StatId,
    pub flat: i32,
    pub percent: i32,
    /// Socket whose occupant contributed this modifier. The projector
    /// guarantees the tag always names a currently occupied socket.
    pub source: SocketId,
}

/// Aggregated contributions for one stat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatTotals {
    pub flat: i32,
    pub percent: i32,
}

impl StatTotals {
    /// Applies the totals to a base value: `(base + flat) × (1 + percent/100)`.
    pub fn apply(&self, base: i32) -> i32 {
        let after_flat = base + self.flat;
        if self.percent == 0 {
            after_flat
        } else {
            (after_flat * (100 + self.percent)) / 100
        }
    }
}

/// Recomputes the stat modifiers contributed by equipped items.
#[derive(Clone, Debug, Default)]
pub struct StatBonusProjector {
    modifiers: Vec<StatModifier>,
}

impl StatBonusProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the modifier batch for one socket.
    ///
    /// Removes every modifier tagged with `socket`, then derives a fresh set
    /// from the occupant's definition base stats, instance overrides, and
    /// affixes. Unknown affix ids are skipped and returned so the caller can
    /// log them; they are never fatal.
    pub fn refresh_socket(
        &mut self,
        catalog: &dyn CatalogProvider,
        socket: SocketId,
        occupant: Option<&ItemStack>,
    ) -> Vec<AffixId> {
        self.modifiers.retain(|modifier| modifier.source != socket);

        let mut unknown_affixes = Vec::new();
        let Some(stack) = occupant else {
            return unknown_affixes;
        };
        let Some(definition) = catalog.lookup(stack.item) else {
            // Unknown occupant (forward-compatible load): contributes nothing.
            return unknown_affixes;
        };

        let mut push_line = |line: &StatLine, modifiers: &mut Vec<StatModifier>| {
            modifiers.push(StatModifier {
                stat: line.stat,
                flat: line.flat,
                percent: line.percent,
                source: socket,
            });
        };

        for line in &definition.base_stats {
            push_line(line, &mut self.modifiers);
        }

        let mut affixes: Vec<AffixId> = definition.affixes.clone();
        if let Some(overrides) = &stack.overrides {
            for line in &overrides.stats {
                push_line(line, &mut self.modifiers);
            }
            affixes.extend(&overrides.affixes);
        }

        for affix_id in affixes {
            match catalog.affix(affix_id) {
                Some(affix) => push_line(&affix.line, &mut self.modifiers),
                None => unknown_affixes.push(affix_id),
            }
        }

        unknown_affixes
    }

    /// Drops every modifier tagged with `socket`.
    pub fn clear_socket(&mut self, socket: SocketId) {
        self.modifiers.retain(|modifier| modifier.source != socket);
    }

    /// Drops all modifiers.
    pub fn clear(&mut self) {
        self.modifiers.clear();
    }

    /// All currently registered modifiers.
    pub fn modifiers(&self) -> &[StatModifier] {
        &self.modifiers
    }

    /// Modifiers contributed by one socket.
    pub fn modifiers_for(&self, socket: SocketId) -> impl Iterator<Item = &StatModifier> {
        self.modifiers
            .iter()
            .filter(move |modifier| modifier.source == socket)
    }

    /// Aggregated contributions for one stat across all sockets.
    ///
    /// Flat values and percent values are each summed; the consumer applies
    /// them to its base value via [`StatTotals::apply`].
    pub fn totals(&self, stat: StatId) -> StatTotals {
        let mut totals = StatTotals::default();
        for modifier in self.modifiers.iter().filter(|m| m.stat == stat) {
            totals.flat += modifier.flat;
            totals.percent += modifier.percent;
        }
        totals
    }
}

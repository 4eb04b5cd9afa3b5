//! Status effects: named bundles of timed stat modifiers.

use emberfall_common::{SourceId, StatusId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats::{Modifier, ModifierKind, StatKind, StatTable};

/// One stat change carried by a status effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusModifier {
    /// Stat to change.
    pub stat: StatKind,
    /// Magnitude.
    pub value: f32,
    /// How it combines.
    pub kind: ModifierKind,
}

/// A status effect definition such as "Burning" or "Slowed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Identity; also the source of every modifier this effect applies.
    pub id: StatusId,
    /// Display name.
    pub name: String,
    /// Default duration in seconds (zero or negative is permanent).
    pub duration: f32,
    /// Stat changes, applied in order.
    #[serde(default)]
    pub modifiers: Vec<StatusModifier>,
}

impl StatusEffect {
    /// Creates an effect with no stat changes.
    #[must_use]
    pub fn new(id: StatusId, name: impl Into<String>, duration: f32) -> Self {
        Self {
            id,
            name: name.into(),
            duration,
            modifiers: Vec::new(),
        }
    }

    /// Adds a stat change (builder pattern).
    #[must_use]
    pub fn with_modifier(mut self, stat: StatKind, value: f32, kind: ModifierKind) -> Self {
        self.modifiers.push(StatusModifier { stat, value, kind });
        self
    }

    /// Source identity of this effect's modifiers.
    #[must_use]
    pub fn source(&self) -> SourceId {
        SourceId::from(self.id)
    }

    /// Applies the effect with its default duration.
    pub fn apply(&self, table: &mut StatTable) {
        self.apply_for(table, self.duration);
    }

    /// Applies the effect for `duration` seconds.
    pub fn apply_for(&self, table: &mut StatTable, duration: f32) {
        debug!(status = %self.name, table = table.label(), duration, "Applying status");
        for entry in &self.modifiers {
            table.add_modifier(
                entry.stat,
                Modifier::new(entry.value, entry.kind, duration, self.source()),
            );
        }
    }

    /// Revokes every modifier this effect applied, leaving others untouched.
    pub fn remove(&self, table: &mut StatTable) -> usize {
        table.remove_modifiers_from(self.source())
    }
}

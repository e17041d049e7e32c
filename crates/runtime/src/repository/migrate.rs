//! Explicit schema migrations for persisted snapshots.
//!
//! Each version bump gets one migration function operating on the raw JSON
//! value before typed deserialization. Payloads from a newer schema than
//! this build supports are refused rather than silently mangled.

use loadout_core::SCHEMA_VERSION;
use serde_json::{Value, json};

use super::error::{RepositoryError, Result};

/// Brings a raw snapshot value up to [`SCHEMA_VERSION`] in place.
pub(crate) fn migrate_to_current(value: &mut Value) -> Result<()> {
    let found = value
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32;

    if found > SCHEMA_VERSION {
        return Err(RepositoryError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    if found < 2 {
        migrate_v1_to_v2(value);
    }

    if let Some(object) = value.as_object_mut() {
        object.insert("schema_version".into(), json!(SCHEMA_VERSION));
    }
    Ok(())
}

/// v1 → v2: slots were a dense `stack | null` array and the currency field
/// was named `gold`.
fn migrate_v1_to_v2(value: &mut Value) {
    let Some(object) = value.as_object_mut() else {
        return;
    };

    if let Some(gold) = object.remove("gold") {
        object.entry("currency").or_insert(gold);
    }

    if let Some(slots) = object.get_mut("slots")
        && let Some(dense) = slots.as_array()
        && dense
            .iter()
            .all(|entry| entry.is_null() || entry.get("slot").is_none())
    {
        let records: Vec<Value> = dense
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_null())
            .map(|(index, entry)| json!({ "slot": index, "stack": entry }))
            .collect();
        *slots = Value::Array(records);
    }
}

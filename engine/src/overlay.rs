//! Edit overlay - pending, unsaved per-field changes.
//!
//! The overlay is a sparse map layered on top of the record store. It only
//! ever holds values that differ from the base record: writing the base value
//! back removes the field, and an entry with no fields is dropped.
//!
//! Entries are never partially flushed. A commit either clears an id's entry
//! entirely or leaves it untouched.

use crate::{
    error::Result,
    snapshot::{OverlaySnapshot, PendingEntry},
    Field, FieldValue, Record, RecordId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pending changes for one record, keyed by field.
pub type PendingChanges = BTreeMap<Field, FieldValue>;

/// Sparse map of unsaved edits keyed by record id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    entries: BTreeMap<RecordId, PendingChanges>,
}

impl Overlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `value` for `field` on record `id`.
    ///
    /// `base` is the record store's current value for that field. Staging the
    /// base value removes any pending change instead. Returns whether a
    /// change is pending for the field afterwards.
    pub fn set_field(
        &mut self,
        id: &str,
        field: Field,
        value: FieldValue,
        base: &FieldValue,
    ) -> Result<bool> {
        field.check(&value)?;

        if &value == base {
            self.clear_field(id, field);
            return Ok(false);
        }

        self.entries
            .entry(id.to_string())
            .or_default()
            .insert(field, value);
        Ok(true)
    }

    /// Get the pending value for a field, if any.
    pub fn get(&self, id: &str, field: Field) -> Option<&FieldValue> {
        self.entries.get(id).and_then(|changes| changes.get(&field))
    }

    /// Pending value if present, otherwise `base`.
    pub fn get_effective(&self, id: &str, field: Field, base: FieldValue) -> FieldValue {
        self.get(id, field).cloned().unwrap_or(base)
    }

    /// All pending changes for a record.
    pub fn changes(&self, id: &str) -> Option<&PendingChanges> {
        self.entries.get(id)
    }

    /// Check if a record has any pending changes.
    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Remove all pending changes for a record.
    pub fn clear(&mut self, id: &str) -> Option<PendingChanges> {
        self.entries.remove(id)
    }

    /// Remove a single pending field, dropping the entry when it empties.
    pub fn clear_field(&mut self, id: &str, field: Field) {
        if let Some(changes) = self.entries.get_mut(id) {
            changes.remove(&field);
            if changes.is_empty() {
                self.entries.remove(id);
            }
        }
    }

    /// Move an entry to a new id (draft id replaced by the backend id).
    pub fn rekey(&mut self, from: &str, to: &str) {
        if let Some(changes) = self.entries.remove(from) {
            self.entries.insert(to.to_string(), changes);
        }
    }

    /// Ids with pending changes, in id order.
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.entries.keys()
    }

    /// Number of records with pending changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge pending changes over a base record.
    pub fn apply_to(&self, record: &Record) -> Record {
        let mut effective = record.clone();
        if let Some(changes) = self.entries.get(&record.id) {
            for (field, value) in changes {
                // Entries were type-checked when staged.
                let _ = effective.set_field(*field, value.clone());
            }
        }
        effective
    }

    /// Drop entries for vanished records and fields that now equal the base.
    pub fn prune_against<'a, F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<&'a Record>,
    {
        self.entries.retain(|id, changes| match lookup(id.as_str()) {
            Some(record) => {
                changes.retain(|field, value| record.field(*field) != *value);
                !changes.is_empty()
            }
            None => false,
        });
    }

    /// Export all pending changes for preview or payload building.
    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot {
            entries: self
                .entries
                .iter()
                .map(|(id, changes)| PendingEntry {
                    id: id.clone(),
                    changes: changes.clone(),
                })
                .collect(),
        }
    }
}

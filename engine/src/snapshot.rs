//! Snapshot of the edit overlay.
//!
//! Snapshots feed the commit payload builder and the "pending changes"
//! preview in the UI. Entries are ordered by record id so serialization is
//! deterministic.

use crate::{overlay::PendingChanges, Error, Field, RecordId};
use serde::{Deserialize, Serialize};

/// Pending changes for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub id: RecordId,
    pub changes: PendingChanges,
}

impl PendingEntry {
    /// Check if the only pending change is a new position.
    pub fn is_index_only(&self) -> bool {
        self.changes.len() == 1 && self.changes.contains_key(&Field::Index)
    }
}

/// A point-in-time copy of the overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySnapshot {
    pub entries: Vec<PendingEntry>,
}

impl OverlaySnapshot {
    /// Get the entry for a record.
    pub fn get(&self, id: &str) -> Option<&PendingEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Number of records with pending changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summarize the snapshot for status displays.
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            record_count: self.entries.len(),
            field_count: self.entries.iter().map(|e| e.changes.len()).sum(),
            reorder_only_count: self.entries.iter().filter(|e| e.is_index_only()).count(),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Serialize to pretty JSON for the debug view.
    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Counts describing a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    /// Records with at least one pending change
    pub record_count: usize,
    /// Pending field changes across all records
    pub field_count: usize,
    /// Records whose only change is their position
    pub reorder_only_count: usize,
}

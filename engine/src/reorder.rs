//! Reorder engine - turns move gestures into index changes.
//!
//! # Algorithm
//!
//! 1. Take the category's displayed order from the record store
//! 2. Splice the moved id from `from_index` to `to_index` (stable)
//! 3. Renumber every record to `position + 1`
//! 4. Stage `index` in the overlay for every record whose displayed index
//!    differs from its base index, and drop the staged index for every
//!    record whose displayed index matches it again
//!
//! Step 4 diffs against the index last confirmed by the backend, so an item
//! moved away and back ends up with no pending index write at all.

use crate::{error::Result, Error, Field, FieldValue, Overlay, RecordId, RecordStore};
use serde::{Deserialize, Serialize};

/// A "move the item at A to position B" gesture within one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEvent {
    pub category: String,
    /// 1-based current position
    pub from_index: u32,
    /// 1-based target position
    pub to_index: u32,
}

impl MoveEvent {
    pub fn new(category: impl Into<String>, from_index: u32, to_index: u32) -> Self {
        Self {
            category: category.into(),
            from_index,
            to_index,
        }
    }
}

/// What a move did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    /// The record that was picked up, `None` for a no-op move
    pub moved: Option<RecordId>,
    /// Records whose displayed index changed, in new order
    pub shifted: Vec<RecordId>,
}

impl MoveOutcome {
    pub fn is_noop(&self) -> bool {
        self.moved.is_none()
    }
}

/// Apply a move event to the store and record the index delta in the overlay.
pub fn apply_move(
    store: &mut RecordStore,
    overlay: &mut Overlay,
    event: &MoveEvent,
) -> Result<MoveOutcome> {
    let ids = store.ids_in_mut(&event.category)?;
    let len = ids.len();

    for position in [event.from_index, event.to_index] {
        if position == 0 || position as usize > len {
            return Err(Error::PositionOutOfRange {
                category: event.category.clone(),
                position,
                len,
            });
        }
    }

    if event.from_index == event.to_index {
        return Ok(MoveOutcome::default());
    }

    let from = event.from_index as usize - 1;
    let to = event.to_index as usize - 1;
    let moved = ids.remove(from);
    ids.insert(to, moved.clone());

    let (low, high) = (from.min(to), from.max(to));
    let shifted = ids[low..=high].to_vec();

    renumber(store, overlay, &event.category)?;

    tracing::debug!(
        category = %event.category,
        from = event.from_index,
        to = event.to_index,
        shifted = shifted.len(),
        "applied move"
    );

    Ok(MoveOutcome {
        moved: Some(moved),
        shifted,
    })
}

/// Move a specific record to a position in the category it belongs to.
///
/// Naming a different category is rejected: records never change category.
pub fn move_record(
    store: &mut RecordStore,
    overlay: &mut Overlay,
    id: &str,
    category: &str,
    to_index: u32,
) -> Result<MoveOutcome> {
    let record = store
        .get(id)
        .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
    if record.category != category {
        return Err(Error::CrossCategoryMove {
            id: id.to_string(),
            actual: record.category.clone(),
            requested: category.to_string(),
        });
    }

    let from_index = store
        .position(id)
        .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
    apply_move(store, overlay, &MoveEvent::new(category, from_index, to_index))
}

/// Bring the overlay's index entries in line with the category's order.
///
/// Returns the number of records with a pending index afterwards.
pub fn renumber(store: &RecordStore, overlay: &mut Overlay, category: &str) -> Result<usize> {
    let mut pending = 0;
    for (position, id) in store.ids_in(category)?.iter().enumerate() {
        let Some(record) = store.get(id) else {
            continue;
        };
        let displayed = FieldValue::Int(position as i64 + 1);
        let base = FieldValue::Int(record.index as i64);
        if overlay.set_field(id, Field::Index, displayed, &base)? {
            pending += 1;
        }
    }
    Ok(pending)
}

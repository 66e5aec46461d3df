//! Record store - the category-partitioned base state.
//!
//! The store owns one ordered id list per category. That list is the single
//! authority on display order: a record's displayed index is its position
//! plus one, so indices are contiguous by construction. The `index` field on
//! each base record keeps the value last confirmed by the backend, which is
//! what the reorder engine diffs against.

use crate::{
    error::Result, ids::DraftIdGenerator, CategoryName, DraftDefaults, Error, Overlay, Record,
    RecordId, Schema,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Base records plus per-category order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStore {
    records: HashMap<RecordId, Record>,
    order: BTreeMap<CategoryName, Vec<RecordId>>,
}

impl RecordStore {
    /// Create an empty store with one list per catalog category.
    pub fn new(schema: &Schema) -> Self {
        let order = schema
            .category_names()
            .map(|name| (name.clone(), Vec::new()))
            .collect();

        Self {
            records: HashMap::new(),
            order,
        }
    }

    /// Replace the whole store with records fetched from the backend.
    ///
    /// Each category is sorted by the backend's index, ties broken by id.
    /// Nothing is replaced if any record names an unknown category.
    pub fn load(&mut self, records: Vec<Record>) -> Result<()> {
        if let Some(unknown) = records.iter().find(|r| !self.order.contains_key(&r.category)) {
            return Err(Error::CategoryNotFound(unknown.category.clone()));
        }

        self.records.clear();
        for ids in self.order.values_mut() {
            ids.clear();
        }

        for mut record in records {
            if self.records.contains_key(&record.id) {
                tracing::warn!(id = %record.id, "duplicate record id in load, keeping first");
                continue;
            }
            record.transient = false;
            if let Some(ids) = self.order.get_mut(&record.category) {
                ids.push(record.id.clone());
            }
            self.records.insert(record.id.clone(), record);
        }

        let records = &self.records;
        for ids in self.order.values_mut() {
            ids.sort_by(|a, b| {
                let (ra, rb) = (&records[a], &records[b]);
                ra.index.cmp(&rb.index).then_with(|| ra.id.cmp(&rb.id))
            });
        }

        Ok(())
    }

    /// Append a new draft to a category and return its id.
    pub fn insert_transient(
        &mut self,
        category: &str,
        defaults: DraftDefaults,
        ids: &mut DraftIdGenerator,
    ) -> Result<RecordId> {
        let records = &self.records;
        let list = self
            .order
            .get_mut(category)
            .ok_or_else(|| Error::CategoryNotFound(category.to_string()))?;

        let id = ids.next_unused(|candidate| records.contains_key(candidate));
        let index = list.len() as u32 + 1;
        list.push(id.clone());

        let record = Record::draft(id.clone(), category, index, defaults);
        self.records.insert(id.clone(), record);
        Ok(id)
    }

    /// Put back a draft that survived a reload, at the end of its category.
    ///
    /// Returns false when its id or category is no longer available.
    pub(crate) fn restore_draft(&mut self, record: Record) -> bool {
        if self.records.contains_key(&record.id) {
            return false;
        }
        let Some(list) = self.order.get_mut(&record.category) else {
            return false;
        };
        list.push(record.id.clone());
        self.records.insert(record.id.clone(), record);
        true
    }

    /// Remove a draft. Persisted records must go through the backend.
    pub fn remove_local(&mut self, id: &str) -> Result<Record> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        if !record.transient {
            return Err(Error::NotTransient(id.to_string()));
        }
        self.remove(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    /// Remove any record, e.g. after the backend confirmed a delete.
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        let record = self.records.remove(id)?;
        if let Some(list) = self.order.get_mut(&record.category) {
            list.retain(|other| other != id);
        }
        Some(record)
    }

    /// Get a base record.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// 1-based displayed position of a record within its category.
    pub fn position(&self, id: &str) -> Option<u32> {
        let record = self.records.get(id)?;
        self.order
            .get(&record.category)?
            .iter()
            .position(|other| other == id)
            .map(|p| p as u32 + 1)
    }

    /// Ordered ids of one category.
    pub fn ids_in(&self, category: &str) -> Result<&[RecordId]> {
        self.order
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::CategoryNotFound(category.to_string()))
    }

    pub(crate) fn ids_in_mut(&mut self, category: &str) -> Result<&mut Vec<RecordId>> {
        self.order
            .get_mut(category)
            .ok_or_else(|| Error::CategoryNotFound(category.to_string()))
    }

    /// Ordered records of one category with pending edits merged in.
    ///
    /// The returned `index` is the displayed position.
    pub fn list_category(&self, category: &str, overlay: &Overlay) -> Result<Vec<Record>> {
        let ids = self.ids_in(category)?;
        Ok(ids
            .iter()
            .enumerate()
            .filter_map(|(position, id)| {
                let mut effective = overlay.apply_to(self.records.get(id)?);
                effective.index = position as u32 + 1;
                Some(effective)
            })
            .collect())
    }

    /// Draft ids in category then position order.
    pub fn transient_ids(&self) -> Vec<RecordId> {
        self.order
            .values()
            .flatten()
            .filter(|id| self.records.get(*id).is_some_and(|r| r.transient))
            .cloned()
            .collect()
    }

    /// Give a record a new id, keeping its position.
    pub(crate) fn rekey(&mut self, from: &str, to: &str) -> Result<()> {
        if from != to && self.records.contains_key(to) {
            return Err(Error::DuplicateRecord(to.to_string()));
        }
        let mut record = self
            .records
            .remove(from)
            .ok_or_else(|| Error::RecordNotFound(from.to_string()))?;
        record.id = to.to_string();

        if let Some(list) = self.order.get_mut(&record.category) {
            if let Some(slot) = list.iter_mut().find(|other| *other == from) {
                *slot = to.to_string();
            }
        }
        self.records.insert(to.to_string(), record);
        Ok(())
    }

    /// Category names known to the store.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryName> {
        self.order.keys()
    }

    /// Total record count.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

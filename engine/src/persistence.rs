//! The persistence collaborator.
//!
//! The engine never talks to the network itself. Everything that reaches the
//! backend goes through [`Persistence`], so hosts plug in an HTTP client and
//! tests plug in [`MemoryBackend`].

use crate::{overlay::PendingChanges, CategoryName, NewQuestion, Record, RecordId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Failure reported by the backend or the transport in front of it.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PersistenceError {
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("backend has no record {0}")]
    NotFound(RecordId),
}

/// Backend operations the engine depends on.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Fetch every question, in any order.
    async fn list_all(&self) -> Result<Vec<Record>, PersistenceError>;

    /// Persist a new question and return the id the backend assigned.
    async fn create(
        &self,
        category: &str,
        fields: &NewQuestion,
    ) -> Result<RecordId, PersistenceError>;

    /// Apply a partial update.
    async fn update(&self, id: &str, changes: &PendingChanges) -> Result<(), PersistenceError>;

    /// Delete a persisted question.
    async fn delete(&self, id: &str) -> Result<(), PersistenceError>;
}

/// A call received by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListAll,
    Create { category: CategoryName, text: String },
    Update { id: RecordId, changes: PendingChanges },
    Delete { id: RecordId },
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<Record>,
    next_id: u64,
    failing: HashSet<String>,
    fail_list: bool,
    calls: Vec<BackendCall>,
}

/// In-memory backend for tests, benchmarks and offline demos.
///
/// Ids are assigned as `q-1`, `q-2`, ... Failures can be injected with
/// [`MemoryBackend::fail_on`]: the key matches the id of an update or delete,
/// or the text of a create.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with persisted records.
    ///
    /// New ids continue after the highest seeded `q-<n>`.
    pub fn with_records(records: Vec<Record>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock();
            state.next_id = records
                .iter()
                .filter_map(|r| r.id.strip_prefix("q-")?.parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            state.records = records;
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; the data is fine.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every request matching `key` fail with a rejection.
    pub fn fail_on(&self, key: impl Into<String>) {
        self.lock().failing.insert(key.into());
    }

    /// Stop failing requests matching `key`.
    pub fn recover(&self, key: &str) {
        self.lock().failing.remove(key);
    }

    /// Make `list_all` fail until called again with `false`.
    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    /// Current backend contents.
    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Number of create, update and delete calls received.
    pub fn write_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, BackendCall::ListAll))
            .count()
    }

    fn rejected(key: &str) -> PersistenceError {
        PersistenceError::Rejected {
            status: 500,
            message: format!("injected failure for {key}"),
        }
    }
}

#[async_trait]
impl Persistence for MemoryBackend {
    async fn list_all(&self) -> Result<Vec<Record>, PersistenceError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::ListAll);
        if state.fail_list {
            return Err(PersistenceError::Transport("list unavailable".into()));
        }
        Ok(state.records.clone())
    }

    async fn create(
        &self,
        category: &str,
        fields: &NewQuestion,
    ) -> Result<RecordId, PersistenceError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Create {
            category: category.to_string(),
            text: fields.text.clone(),
        });
        if state.failing.contains(&fields.text) {
            return Err(Self::rejected(&fields.text));
        }

        state.next_id += 1;
        let id = format!("q-{}", state.next_id);
        state.records.push(Record::persisted(
            id.clone(),
            category,
            fields.sub_category.clone(),
            fields.text.clone(),
            fields.mark,
            fields.index,
        ));
        Ok(id)
    }

    async fn update(&self, id: &str, changes: &PendingChanges) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Update {
            id: id.to_string(),
            changes: changes.clone(),
        });
        if state.failing.contains(id) {
            return Err(Self::rejected(id));
        }

        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        for (field, value) in changes {
            record
                .set_field(*field, value.clone())
                .map_err(|e| PersistenceError::Rejected {
                    status: 422,
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Delete { id: id.to_string() });
        if state.failing.contains(id) {
            return Err(Self::rejected(id));
        }

        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(PersistenceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, FieldValue};

    fn question(text: &str) -> NewQuestion {
        NewQuestion {
            category: "Social".into(),
            sub_category: "Community".into(),
            text: text.into(),
            mark: 2,
            index: 1,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let backend = MemoryBackend::with_records(vec![Record::persisted(
            "q-1", "Social", "Community", "existing", 1, 1,
        )]);

        let id = backend.create("Social", &question("new")).await.unwrap();
        assert_eq!(id, "q-2");
        assert_eq!(backend.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_skips_seeded_ids_with_gaps() {
        let backend = MemoryBackend::with_records(vec![
            Record::persisted("q-1", "Social", "Community", "a", 1, 1),
            Record::persisted("q-3", "Social", "Community", "c", 1, 2),
        ]);

        let id = backend.create("Social", &question("new")).await.unwrap();
        assert_eq!(id, "q-4");
    }

    #[tokio::test]
    async fn update_applies_changes() {
        let backend = MemoryBackend::new();
        let id = backend.create("Social", &question("old")).await.unwrap();

        let changes: PendingChanges = [(Field::Text, FieldValue::String("new".into()))]
            .into_iter()
            .collect();
        backend.update(&id, &changes).await.unwrap();

        assert_eq!(backend.records()[0].text, "new");
        assert!(matches!(
            backend.update("q-99", &changes).await,
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let backend = MemoryBackend::new();
        let id = backend.create("Social", &question("doomed")).await.unwrap();

        backend.delete(&id).await.unwrap();
        assert!(backend.records().is_empty());
        assert!(backend.delete(&id).await.is_err());
    }

    #[tokio::test]
    async fn injected_failures() {
        let backend = MemoryBackend::new();
        backend.fail_on("bad text");

        let result = backend.create("Social", &question("bad text")).await;
        assert!(matches!(
            result,
            Err(PersistenceError::Rejected { status: 500, .. })
        ));

        backend.recover("bad text");
        assert!(backend.create("Social", &question("bad text")).await.is_ok());

        backend.fail_list(true);
        assert!(backend.list_all().await.is_err());
    }

    #[tokio::test]
    async fn records_calls() {
        let backend = MemoryBackend::new();
        backend.list_all().await.unwrap();
        backend.create("Social", &question("a")).await.unwrap();

        assert_eq!(backend.write_count(), 1);
        assert_eq!(backend.calls()[0], BackendCall::ListAll);
    }

    #[test]
    fn error_display() {
        let err = PersistenceError::Rejected {
            status: 409,
            message: "duplicate".into(),
        };
        assert_eq!(
            err.to_string(),
            "backend rejected the request (409): duplicate"
        );
    }
}

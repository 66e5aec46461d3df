//! Editor session manager.
//!
//! Each open editor gets its own session with its own store and overlay.
//! Sessions are independent, so one user's commit never blocks another's
//! edits.

use std::sync::Arc;

use assessment_engine::Editor;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

/// Session id, a v4 uuid.
pub type SessionId = String;

/// One open editor.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub editor: Editor,
    pub opened_at: DateTime<Utc>,
}

/// Shared handle to a session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Summary returned when a session is opened or inspected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub opened_at: DateTime<Utc>,
    pub record_count: usize,
    pub committing: bool,
}

impl Session {
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            opened_at: self.opened_at,
            record_count: self.editor.store().len(),
            committing: self.editor.is_committing(),
        }
    }
}

/// Manages open editor sessions.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a new session manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register an editor and return its session.
    pub fn open(&self, editor: Editor) -> SessionHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(Session {
            id: id.clone(),
            editor,
            opened_at: Utc::now(),
        }));

        self.sessions.insert(id.clone(), session.clone());
        tracing::info!(session = %id, "editor session opened");
        session
    }

    /// Look up a session.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Check whether `handle` is still the registered session for `id`.
    pub fn is_current(&self, id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), handle))
    }

    /// Tear down a session.
    ///
    /// A commit still in flight for it finishes against the backend, but its
    /// results are never written back.
    pub fn close(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "editor session closed");
        }
        removed
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessment_engine::Schema;

    fn editor() -> Editor {
        Editor::new(Schema::assessment()).unwrap()
    }

    #[tokio::test]
    async fn open_and_get() {
        let manager = SessionManager::new();
        let handle = manager.open(editor());
        let id = handle.lock().await.id.clone();

        assert_eq!(manager.len(), 1);
        let found = manager.get(&id).unwrap();
        assert!(Arc::ptr_eq(&found, &handle));
        assert!(manager.is_current(&id, &handle));
    }

    #[tokio::test]
    async fn close_detaches_handle() {
        let manager = SessionManager::new();
        let handle = manager.open(editor());
        let id = handle.lock().await.id.clone();

        assert!(manager.close(&id));
        assert!(!manager.close(&id));
        assert!(manager.get(&id).is_none());
        assert!(!manager.is_current(&id, &handle));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn session_info() {
        let manager = SessionManager::new();
        let handle = manager.open(editor());
        let info = handle.lock().await.info();

        assert_eq!(info.record_count, 0);
        assert!(!info.committing);
        let json = serde_json::to_value(&info).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["committing", "id", "openedAt", "recordCount"]);
        assert_eq!(json["id"], info.id.as_str());
    }
}

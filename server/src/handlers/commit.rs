//! Commit handler - runs a split commit for one session.
//!
//! The session lock is held only while collecting and while reconciling.
//! During dispatch other requests can still read the session; their
//! mutations are refused until the commit finishes.
//!
//! Dispatch and reconciliation run in their own task, so a client that
//! disconnects mid-commit does not leave the session locked: the requests
//! already sent complete and their results are written back regardless.

use crate::error::{AppError, Result};
use crate::handlers::records::session;
use crate::sessions::SessionHandle;
use crate::AppState;
use assessment_engine::{dispatch, CommitPlan, CommitReport};

/// Commit everything pending in a session.
pub async fn handle_commit(state: &AppState, session_id: &str) -> Result<CommitReport> {
    let handle = session(state, session_id)?;

    let plan = handle.lock().await.editor.begin_commit()?;
    if plan.requests.is_empty() {
        let mut session = handle.lock().await;
        return Ok(session.editor.finish_commit(plan, Vec::new(), None)?);
    }

    let task = tokio::spawn(run_commit(
        state.clone(),
        session_id.to_string(),
        handle,
        plan,
    ));
    task.await
        .map_err(|e| AppError::Internal(format!("commit task failed: {e}")))?
}

async fn run_commit(
    state: AppState,
    session_id: String,
    handle: SessionHandle,
    plan: CommitPlan,
) -> Result<CommitReport> {
    let outcomes = dispatch(&plan, state.backend.as_ref()).await;
    let reload = state.backend.list_all().await;

    if !state.sessions.is_current(&session_id, &handle) {
        tracing::warn!(
            session = %session_id,
            ticket = plan.ticket.0,
            "session closed during commit, discarding results"
        );
        return Err(AppError::NotFound(format!("session {session_id}")));
    }

    let mut session = handle.lock().await;
    Ok(session.editor.finish_commit(plan, outcomes, Some(reload))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionManager;
    use assessment_engine::{
        Editor, Field, FieldValue, MemoryBackend, NewQuestion, PendingChanges, Persistence,
        PersistenceError, Record, RecordId, Schema,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds every update until released.
    #[derive(Default)]
    struct GatedBackend {
        inner: MemoryBackend,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Persistence for GatedBackend {
        async fn list_all(&self) -> std::result::Result<Vec<Record>, PersistenceError> {
            self.inner.list_all().await
        }

        async fn create(
            &self,
            category: &str,
            fields: &NewQuestion,
        ) -> std::result::Result<RecordId, PersistenceError> {
            self.inner.create(category, fields).await
        }

        async fn update(
            &self,
            id: &str,
            changes: &PendingChanges,
        ) -> std::result::Result<(), PersistenceError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.update(id, changes).await
        }

        async fn delete(&self, id: &str) -> std::result::Result<(), PersistenceError> {
            self.inner.delete(id).await
        }
    }

    async fn setup() -> (AppState, Arc<GatedBackend>, String, SessionHandle) {
        let backend = Arc::new(GatedBackend {
            inner: MemoryBackend::with_records(vec![Record::persisted(
                "q-1", "Social", "Community", "A", 1, 1,
            )]),
            ..Default::default()
        });
        let state = AppState {
            sessions: SessionManager::new_shared(),
            backend: backend.clone(),
            schema: Arc::new(Schema::assessment()),
        };

        let mut editor = Editor::new(Schema::assessment()).unwrap();
        editor.load(backend.list_all().await.unwrap()).unwrap();
        editor.set_field("q-1", Field::Text, "A2".into()).unwrap();
        let handle = state.sessions.open(editor);
        let id = handle.lock().await.id.clone();
        (state, backend, id, handle)
    }

    fn spawn_commit(
        state: &AppState,
        id: &str,
    ) -> tokio::task::JoinHandle<Result<CommitReport>> {
        let (state, id) = (state.clone(), id.to_string());
        tokio::spawn(async move { handle_commit(&state, &id).await })
    }

    #[tokio::test]
    async fn commit_finishes_after_the_caller_goes_away() {
        let (state, backend, id, handle) = setup().await;

        let caller = spawn_commit(&state, &id);
        backend.entered.notified().await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        backend.release.notify_one();
        tokio::time::timeout(Duration::from_secs(5), async {
            while handle.lock().await.editor.is_committing() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let session = handle.lock().await;
        assert!(!session.editor.has_pending());
        assert_eq!(session.editor.record("q-1").unwrap().text, "A2");
        assert_eq!(backend.inner.records()[0].text, "A2");
    }

    #[tokio::test]
    async fn closed_session_discards_commit_results() {
        let (state, backend, id, handle) = setup().await;

        let caller = spawn_commit(&state, &id);
        backend.entered.notified().await;
        assert!(state.sessions.close(&id));
        backend.release.notify_one();

        let result = caller.await.unwrap();
        assert!(matches!(result, Err(AppError::NotFound(_))));

        // The backend saw the write, the torn-down editor was never touched
        assert_eq!(backend.inner.records()[0].text, "A2");
        let session = handle.lock().await;
        assert!(session.editor.is_committing());
        assert_eq!(session.editor.record("q-1").unwrap().text, "A");
        assert_eq!(
            session.editor.overlay().get("q-1", Field::Text),
            Some(&FieldValue::from("A2"))
        );
    }
}

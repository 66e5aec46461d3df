//! Record handlers - reads and edits within one session.
//!
//! Every handler holds the session lock for its whole duration. Mutations
//! made while a commit of the same session is in flight are refused by the
//! editor and surface as `409 Conflict`.

use crate::error::{AppError, Result};
use crate::sessions::SessionHandle;
use crate::AppState;
use assessment_engine::{
    DeleteOutcome, DraftDefaults, Field, FieldValue, MoveEvent, MoveOutcome, PendingEntry, Record,
    RecordId, SnapshotSummary,
};
use serde::{Deserialize, Serialize};

/// Ordered records of one category.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListing {
    pub category: String,
    pub records: Vec<Record>,
}

/// Request body for a field edit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFieldRequest {
    pub field: Field,
    pub value: FieldValue,
}

/// Everything a commit would send right now.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub summary: SnapshotSummary,
    pub entries: Vec<PendingEntry>,
    /// Drafts, in category then position order
    pub drafts: Vec<RecordId>,
}

pub(crate) fn session(state: &AppState, session_id: &str) -> Result<SessionHandle> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))
}

/// List one category with pending edits merged in.
pub async fn handle_list(
    state: &AppState,
    session_id: &str,
    category: &str,
) -> Result<CategoryListing> {
    let handle = session(state, session_id)?;
    let session = handle.lock().await;
    let records = session.editor.list_category(category)?;

    Ok(CategoryListing {
        category: category.to_string(),
        records,
    })
}

/// Add a draft at the end of a category.
pub async fn handle_add_draft(
    state: &AppState,
    session_id: &str,
    category: &str,
    defaults: DraftDefaults,
) -> Result<Record> {
    let handle = session(state, session_id)?;
    let mut session = handle.lock().await;
    let id = session.editor.add_draft(category, defaults)?;

    session
        .editor
        .effective(&id)
        .ok_or_else(|| AppError::NotFound(format!("record {id}")))
}

/// Stage a field edit and return the record's effective values.
pub async fn handle_set_field(
    state: &AppState,
    session_id: &str,
    record_id: &str,
    request: SetFieldRequest,
) -> Result<Record> {
    let handle = session(state, session_id)?;
    let mut session = handle.lock().await;
    session
        .editor
        .set_field(record_id, request.field, request.value)?;

    session
        .editor
        .effective(record_id)
        .ok_or_else(|| AppError::NotFound(format!("record {record_id}")))
}

/// Remove a draft locally, or delete a persisted record on the backend.
pub async fn handle_delete(
    state: &AppState,
    session_id: &str,
    record_id: &str,
) -> Result<DeleteOutcome> {
    let handle = session(state, session_id)?;
    let mut session = handle.lock().await;
    let outcome = session
        .editor
        .delete(record_id, state.backend.as_ref())
        .await?;
    Ok(outcome)
}

/// Apply a move gesture.
pub async fn handle_move(
    state: &AppState,
    session_id: &str,
    event: MoveEvent,
) -> Result<MoveOutcome> {
    let handle = session(state, session_id)?;
    let mut session = handle.lock().await;
    Ok(session.editor.move_record(&event)?)
}

/// Preview what a commit would send.
pub async fn handle_pending(state: &AppState, session_id: &str) -> Result<PendingResponse> {
    let handle = session(state, session_id)?;
    let session = handle.lock().await;
    let snapshot = session.editor.pending();

    Ok(PendingResponse {
        summary: snapshot.summary(),
        entries: snapshot.entries,
        drafts: session.editor.store().transient_ids(),
    })
}

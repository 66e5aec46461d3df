//! Session handlers - open and tear down editor sessions.

use crate::error::{AppError, Result};
use crate::sessions::SessionInfo;
use crate::AppState;
use assessment_engine::Editor;

/// Open a session loaded with everything the backend holds.
pub async fn handle_open(state: &AppState) -> Result<SessionInfo> {
    let records = state.backend.list_all().await?;

    let mut editor = Editor::new(state.schema.as_ref().clone())?;
    editor.load(records)?;

    let handle = state.sessions.open(editor);
    let info = handle.lock().await.info();
    Ok(info)
}

/// Tear down a session.
pub fn handle_close(state: &AppState, session_id: &str) -> Result<()> {
    if state.sessions.close(session_id) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("session {session_id}")))
    }
}

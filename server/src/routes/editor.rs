//! Editor session routes.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::handlers::{
    handle_add_draft, handle_close, handle_commit, handle_delete, handle_list, handle_move,
    handle_open, handle_pending, handle_set_field, CategoryListing, PendingResponse,
    SetFieldRequest,
};
use crate::sessions::SessionInfo;
use crate::AppState;
use assessment_engine::{CommitReport, DeleteOutcome, DraftDefaults, MoveEvent, MoveOutcome, Record, Schema};

/// Create editor routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories_handler))
        .route("/sessions", post(open_handler))
        .route("/sessions/{id}", delete(close_handler))
        .route("/sessions/{id}/categories/{category}", get(list_handler))
        .route(
            "/sessions/{id}/categories/{category}/drafts",
            post(add_draft_handler),
        )
        .route(
            "/sessions/{id}/records/{record_id}",
            patch(set_field_handler).delete(delete_handler),
        )
        .route("/sessions/{id}/moves", post(move_handler))
        .route("/sessions/{id}/pending", get(pending_handler))
        .route("/sessions/{id}/commit", post(commit_handler))
}

/// GET /categories - Category catalog.
async fn categories_handler(State(state): State<AppState>) -> Json<Schema> {
    Json(state.schema.as_ref().clone())
}

/// POST /sessions - Open an editor session.
async fn open_handler(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionInfo>)> {
    let info = handle_open(&state).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// DELETE /sessions/{id} - Tear down a session.
async fn close_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    handle_close(&state, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /sessions/{id}/categories/{category} - Ordered effective records.
async fn list_handler(
    State(state): State<AppState>,
    Path((id, category)): Path<(String, String)>,
) -> Result<Json<CategoryListing>> {
    let listing = handle_list(&state, &id, &category).await?;
    Ok(Json(listing))
}

/// POST /sessions/{id}/categories/{category}/drafts - Add a draft.
///
/// The body is optional; an empty body uses blank defaults.
async fn add_draft_handler(
    State(state): State<AppState>,
    Path((id, category)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>)> {
    let defaults = if body.is_empty() {
        DraftDefaults::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };

    let record = handle_add_draft(&state, &id, &category, defaults).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PATCH /sessions/{id}/records/{record_id} - Stage a field edit.
async fn set_field_handler(
    State(state): State<AppState>,
    Path((id, record_id)): Path<(String, String)>,
    Json(request): Json<SetFieldRequest>,
) -> Result<Json<Record>> {
    let record = handle_set_field(&state, &id, &record_id, request).await?;
    Ok(Json(record))
}

/// DELETE /sessions/{id}/records/{record_id} - Remove a record.
async fn delete_handler(
    State(state): State<AppState>,
    Path((id, record_id)): Path<(String, String)>,
) -> Result<Json<DeleteOutcome>> {
    let outcome = handle_delete(&state, &id, &record_id).await?;
    Ok(Json(outcome))
}

/// POST /sessions/{id}/moves - Apply a move gesture.
async fn move_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<MoveEvent>,
) -> Result<Json<MoveOutcome>> {
    let outcome = handle_move(&state, &id, event).await?;
    Ok(Json(outcome))
}

/// GET /sessions/{id}/pending - Preview pending changes.
async fn pending_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PendingResponse>> {
    let pending = handle_pending(&state, &id).await?;
    Ok(Json(pending))
}

/// POST /sessions/{id}/commit - Commit pending changes.
async fn commit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommitReport>> {
    let report = handle_commit(&state, &id).await?;
    Ok(Json(report))
}

//! Sync engine - turns pending state into backend requests.
//!
//! A commit moves through `Idle → Collecting → Dispatching → Reconciling →
//! Idle`. This module holds the pieces of each phase; [`crate::Editor`]
//! drives them and owns the single-flight guard.
//!
//! # Algorithm
//!
//! 1. Collect every draft plus every id with an overlay entry
//! 2. Drafts are validated; valid ones become creates carrying their
//!    effective values, invalid ones become validation errors
//! 3. Persisted ids become updates carrying only their overlay entry
//! 4. Dispatch every request concurrently and wait for all outcomes
//! 5. Successes are folded into the base and their overlay entry cleared;
//!    failures keep their overlay entry untouched

use crate::{
    error::Result,
    operation::{CreateRequest, Request, RequestKind, UpdateRequest},
    persistence::{Persistence, PersistenceError},
    reorder::renumber,
    validation::{validate_draft, ValidationError},
    Overlay, RecordId, RecordStore, Schema,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where the editor is in the commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Collecting,
    Dispatching,
    Reconciling,
}

/// Identifies one outstanding commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitTicket(pub u64);

/// Requests to send for one commit, plus the drafts that were held back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPlan {
    pub ticket: CommitTicket,
    pub requests: Vec<Request>,
    pub validation_errors: Vec<ValidationError>,
}

impl CommitPlan {
    /// Nothing to send and nothing held back.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.validation_errors.is_empty()
    }
}

/// Result of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub request: Request,
    /// The backend id for a successful create, `None` for other successes
    pub result: std::result::Result<Option<RecordId>, PersistenceError>,
}

/// A request the backend refused or never answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestError {
    pub id: RecordId,
    pub kind: RequestKind,
    pub message: String,
}

impl RequestError {
    pub fn new(id: impl Into<RecordId>, kind: RequestKind, error: &PersistenceError) -> Self {
        Self {
            id: id.into(),
            kind,
            message: error.to_string(),
        }
    }
}

/// What a commit achieved.
///
/// Partial success is a normal outcome: a report can carry saved records and
/// errors at the same time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub saved_count: usize,
    pub validation_errors: Vec<ValidationError>,
    pub request_errors: Vec<RequestError>,
    /// Set when the post-commit reload failed; local state was kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_error: Option<String>,
}

impl CommitReport {
    /// Nothing was pending.
    pub fn is_noop(&self) -> bool {
        self.saved_count == 0
            && self.validation_errors.is_empty()
            && self.request_errors.is_empty()
            && self.reload_error.is_none()
    }

    /// Some record could not be saved.
    pub fn has_failures(&self) -> bool {
        !self.validation_errors.is_empty() || !self.request_errors.is_empty()
    }

    /// The caller should show a success acknowledgment.
    pub fn should_acknowledge(&self) -> bool {
        self.saved_count > 0
    }
}

/// Build the requests for everything pending.
///
/// Drafts come first in category then position order, followed by updates in
/// id order.
pub fn collect(
    schema: &Schema,
    store: &RecordStore,
    overlay: &Overlay,
) -> Result<(Vec<Request>, Vec<ValidationError>)> {
    let mut requests = Vec::new();
    let mut validation_errors = Vec::new();

    for id in store.transient_ids() {
        let Some(base) = store.get(&id) else {
            continue;
        };
        let mut effective = overlay.apply_to(base);
        if let Some(position) = store.position(&id) {
            effective.index = position;
        }

        let category = schema.require(&effective.category)?;
        match validate_draft(&effective, category) {
            Ok(question) => requests.push(Request::Create(CreateRequest {
                draft_id: id,
                question,
            })),
            Err(issues) => validation_errors.push(ValidationError {
                id,
                category: effective.category,
                issues,
            }),
        }
    }

    for id in overlay.ids() {
        match store.get(id) {
            // Draft entries travel inside the create payload.
            Some(record) if record.transient => {}
            Some(_) => {
                if let Some(changes) = overlay.changes(id) {
                    requests.push(Request::Update(UpdateRequest {
                        id: id.clone(),
                        changes: changes.clone(),
                    }));
                }
            }
            None => tracing::warn!(%id, "overlay entry without a record, skipping"),
        }
    }

    Ok((requests, validation_errors))
}

/// Send every request of a plan concurrently and wait for all of them.
pub async fn dispatch(plan: &CommitPlan, backend: &dyn Persistence) -> Vec<RequestOutcome> {
    let pending = plan.requests.iter().map(|request| async move {
        let result = match request {
            Request::Create(req) => backend
                .create(&req.question.category, &req.question)
                .await
                .map(Some),
            Request::Update(req) => backend.update(&req.id, &req.changes).await.map(|_| None),
        };
        if let Err(error) = &result {
            tracing::warn!(
                id = %request.record_id(),
                kind = %request.kind(),
                %error,
                "request failed"
            );
        }
        RequestOutcome {
            request: request.clone(),
            result,
        }
    });

    join_all(pending).await
}

/// Fold request outcomes into the store and overlay.
///
/// Returns the number of saved records and the failures. Every category that
/// was touched is renumbered afterwards so pending index entries are diffed
/// against the new base.
pub fn apply_outcomes(
    store: &mut RecordStore,
    overlay: &mut Overlay,
    outcomes: Vec<RequestOutcome>,
) -> Result<(usize, Vec<RequestError>)> {
    let mut saved = 0;
    let mut errors = Vec::new();
    let mut touched = BTreeSet::new();

    for outcome in outcomes {
        let id = outcome.request.record_id().clone();
        let kind = outcome.request.kind();

        match (outcome.request, outcome.result) {
            (_, Err(error)) => errors.push(RequestError::new(id, kind, &error)),

            (Request::Create(req), Ok(Some(new_id))) => {
                let Some(base) = store.get(&req.draft_id) else {
                    tracing::warn!(draft = %req.draft_id, "created draft vanished, skipping write-back");
                    continue;
                };
                // Re-keying onto a known id would overwrite that record.
                if store.contains(&new_id) {
                    tracing::warn!(draft = %req.draft_id, id = %new_id, "create returned an id already in use");
                    let error = PersistenceError::Decode(format!(
                        "create returned id {new_id}, which is already in use"
                    ));
                    errors.push(RequestError::new(req.draft_id, kind, &error));
                    continue;
                }
                let mut confirmed = overlay.apply_to(base);
                confirmed.mark = Some(req.question.mark);
                confirmed.index = req.question.index;
                confirmed.transient = false;

                overlay.clear(&req.draft_id);
                store.rekey(&req.draft_id, &new_id)?;
                if let Some(record) = store.get_mut(&new_id) {
                    confirmed.id = new_id.clone();
                    *record = confirmed;
                }
                touched.insert(req.question.category);
                tracing::debug!(draft = %req.draft_id, id = %new_id, "draft persisted");
                saved += 1;
            }

            (Request::Create(req), Ok(None)) => {
                let error = PersistenceError::Decode("create returned no id".into());
                errors.push(RequestError::new(req.draft_id, kind, &error));
            }

            (Request::Update(req), Ok(_)) => {
                if let Some(record) = store.get_mut(&req.id) {
                    for (field, value) in &req.changes {
                        record.set_field(*field, value.clone())?;
                    }
                    touched.insert(record.category.clone());
                }
                overlay.clear(&req.id);
                saved += 1;
            }
        }
    }

    for category in &touched {
        renumber(store, overlay, category)?;
    }

    Ok((saved, errors))
}

//! Requests produced by a commit.
//!
//! A commit turns drafts into [`CreateRequest`]s carrying their effective
//! values, and overlay entries of persisted records into [`UpdateRequest`]s
//! carrying only the changed fields.

use crate::{overlay::PendingChanges, NewQuestion, RecordId};
use serde::{Deserialize, Serialize};

/// Persist a draft for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Local id of the draft; the backend assigns the real one
    pub draft_id: RecordId,
    pub question: NewQuestion,
}

/// Send the pending changes of a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub id: RecordId,
    /// Only the fields present in the overlay entry
    pub changes: PendingChanges,
}

/// One request against the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    Create(CreateRequest),
    Update(UpdateRequest),
}

/// Kind of request, used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Create => write!(f, "create"),
            RequestKind::Update => write!(f, "update"),
            RequestKind::Delete => write!(f, "delete"),
        }
    }
}

impl Request {
    /// The local record this request is about.
    pub fn record_id(&self) -> &RecordId {
        match self {
            Request::Create(req) => &req.draft_id,
            Request::Update(req) => &req.id,
        }
    }

    /// Kind of this request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Create(_) => RequestKind::Create,
            Request::Update(_) => RequestKind::Update,
        }
    }
}

//! # Assessment Engine
//!
//! An editable collection synchronization engine for assessment questions.
//!
//! This crate holds the state behind a categorized, ordered question editor:
//! drag reordering within a category, per-field inline edits tracked apart
//! from the base data, drafts interleaved with persisted questions, and a
//! batch commit that reports partial failure as data.
//!
//! ## Design Principles
//!
//! - **No IO of its own**: the backend is reached through the [`Persistence`] trait
//! - **One order per category**: displayed index is always position + 1
//! - **Minimal diffs**: the overlay only holds values that differ from the base
//! - **Single flight**: one commit at a time, mutations blocked while it runs
//!
//! ## Core Concepts
//!
//! ### Record Store
//!
//! [`RecordStore`] keeps the base records and one ordered id list per
//! category. Drafts are records with `transient = true` and a locally
//! generated id.
//!
//! ### Edit Overlay
//!
//! [`Overlay`] is a sparse `id -> {field: value}` map of unsaved edits.
//! Writing the base value back removes the pending change.
//!
//! ### Reordering
//!
//! [`apply_move`] splices one id within its category and stages an `index`
//! change for every record whose position no longer matches the index last
//! confirmed by the backend.
//!
//! ### Commit
//!
//! [`Editor::commit`] validates drafts, sends creates and minimal updates
//! concurrently, folds successes back in and reloads. The result is a
//! [`CommitReport`].
//!
//! ## Quick Start
//!
//! ```rust
//! use assessment_engine::{DraftDefaults, Editor, Field, MoveEvent, Record, Schema};
//!
//! // 1. Create an editor for the built-in catalog
//! let mut editor = Editor::new(Schema::assessment()).unwrap();
//!
//! // 2. Load what the backend returned
//! editor
//!     .load(vec![
//!         Record::persisted("q-1", "Social", "Community", "Do you consult locals?", 2, 1),
//!         Record::persisted("q-2", "Social", "Labour", "Do you pay a living wage?", 3, 2),
//!     ])
//!     .unwrap();
//!
//! // 3. Edit, reorder and add a draft
//! editor.set_field("q-1", Field::Text, "Do you consult local residents?".into()).unwrap();
//! editor.move_record(&MoveEvent::new("Social", 2, 1)).unwrap();
//! let draft = editor.add_draft("Social", DraftDefaults::default()).unwrap();
//!
//! // 4. Inspect the displayed order and what a commit would send
//! let ids: Vec<_> = editor.list_category("Social").unwrap().into_iter().map(|r| r.id).collect();
//! assert_eq!(ids, vec!["q-2".to_string(), "q-1".to_string(), draft]);
//! assert_eq!(editor.pending().len(), 2);
//! ```
//!
//! ## Persistence
//!
//! Hosts implement [`Persistence`] for their backend. [`MemoryBackend`] is
//! an in-memory implementation for tests and offline use.

pub mod editor;
pub mod error;
pub mod ids;
pub mod operation;
pub mod overlay;
pub mod persistence;
pub mod record;
pub mod reorder;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod validation;

// Re-export main types at crate root
pub use editor::{DeleteOutcome, Editor};
pub use error::Error;
pub use ids::{DraftIdGenerator, DRAFT_PREFIX};
pub use operation::{CreateRequest, Request, RequestKind, UpdateRequest};
pub use overlay::{Overlay, PendingChanges};
pub use persistence::{BackendCall, MemoryBackend, Persistence, PersistenceError};
pub use record::{DraftDefaults, Field, FieldValue, NewQuestion, Record};
pub use reorder::{apply_move, move_record, renumber, MoveEvent, MoveOutcome};
pub use schema::{CategorySchema, Schema};
pub use snapshot::{OverlaySnapshot, PendingEntry, SnapshotSummary};
pub use store::RecordStore;
pub use sync::{
    collect, dispatch, CommitPlan, CommitReport, CommitTicket, RequestError, RequestOutcome,
    SyncPhase,
};
pub use validation::{validate_draft, ValidationError, ValidationIssue};

/// Type aliases for clarity
pub type RecordId = String;
pub type CategoryName = String;
pub type SchemaVersion = u32;

//! Editor - the question editor's state container.
//!
//! The editor owns the record store, the edit overlay and the commit
//! lifecycle. Every user action goes through it so the single-flight rule
//! holds: while a commit is outstanding, reads work and mutations fail with
//! [`Error::CommitInProgress`].

use crate::{
    error::Result,
    ids::DraftIdGenerator,
    operation::RequestKind,
    persistence::{Persistence, PersistenceError},
    reorder::{self, MoveEvent, MoveOutcome},
    snapshot::OverlaySnapshot,
    sync::{self, CommitPlan, CommitReport, CommitTicket, RequestError, RequestOutcome, SyncPhase},
    DraftDefaults, Error, Field, FieldValue, Overlay, Record, RecordId, RecordStore, Schema,
};
use serde::{Deserialize, Serialize};

/// Result of deleting a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "camelCase")]
pub enum DeleteOutcome {
    Removed,
    /// The backend refused; the record stays
    Rejected(RequestError),
}

/// The question editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Editor {
    schema: Schema,
    store: RecordStore,
    overlay: Overlay,
    ids: DraftIdGenerator,
    phase: SyncPhase,
    outstanding: Option<CommitTicket>,
    next_ticket: u64,
}

impl Editor {
    /// Create an empty editor for a catalog.
    pub fn new(schema: Schema) -> Result<Self> {
        schema.validate()?;
        let store = RecordStore::new(&schema);
        Ok(Self {
            schema,
            store,
            overlay: Overlay::new(),
            ids: DraftIdGenerator::new(),
            phase: SyncPhase::Idle,
            outstanding: None,
            next_ticket: 0,
        })
    }

    /// Builder-style method to use a custom draft id generator.
    pub fn with_id_generator(mut self, ids: DraftIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Get the catalog.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the base state.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Get the pending edits.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Current commit phase.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Check if a commit is outstanding.
    pub fn is_committing(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Ticket of the outstanding commit, if any.
    ///
    /// Hosts that drive the split commit can hand it to
    /// [`Editor::abort_commit`] when they give up on the dispatch.
    pub fn outstanding_ticket(&self) -> Option<CommitTicket> {
        self.outstanding
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.outstanding.is_some() {
            tracing::warn!(phase = ?self.phase, "mutation rejected while a commit is outstanding");
            return Err(Error::CommitInProgress);
        }
        Ok(())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the base state with records fetched from the backend.
    ///
    /// Drafts are kept at the end of their category and overlay entries
    /// survive for ids that still exist.
    pub fn load(&mut self, records: Vec<Record>) -> Result<()> {
        self.ensure_idle()?;
        self.reload(records)
    }

    fn reload(&mut self, records: Vec<Record>) -> Result<()> {
        let drafts: Vec<Record> = self
            .store
            .transient_ids()
            .iter()
            .filter_map(|id| self.store.get(id).cloned())
            .collect();

        self.store.load(records)?;
        for draft in drafts {
            let id = draft.id.clone();
            if !self.store.restore_draft(draft) {
                tracing::warn!(%id, "draft could not be restored after reload");
            }
        }

        let store = &self.store;
        self.overlay.prune_against(|id| store.get(id));

        // Pending moves outlive the reload: order by effective index.
        let categories: Vec<String> = self.store.categories().cloned().collect();
        for category in &categories {
            let mut ids = self.store.ids_in(category)?.to_vec();
            ids.sort_by_key(|id| self.effective_index(id));
            *self.store.ids_in_mut(category)? = ids;
            reorder::renumber(&self.store, &mut self.overlay, category)?;
        }

        tracing::debug!(records = self.store.len(), pending = self.overlay.len(), "store loaded");
        Ok(())
    }

    fn effective_index(&self, id: &str) -> i64 {
        self.overlay
            .get(id, Field::Index)
            .and_then(FieldValue::as_int)
            .or_else(|| self.store.get(id).map(|r| r.index as i64))
            .unwrap_or(i64::MAX)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a draft at the end of a category.
    pub fn add_draft(&mut self, category: &str, mut defaults: DraftDefaults) -> Result<RecordId> {
        self.ensure_idle()?;
        if self.schema.require(category)?.marks_exempt {
            defaults.mark = Some(0);
        }
        let id = self.store.insert_transient(category, defaults, &mut self.ids)?;
        tracing::debug!(%id, category, "draft added");
        Ok(id)
    }

    /// Stage a field edit.
    ///
    /// Staging the base value drops the pending change. An `index` edit is
    /// a move within the record's category.
    pub fn set_field(&mut self, id: &str, field: Field, value: FieldValue) -> Result<()> {
        self.ensure_idle()?;
        let record = self.store.get(id).ok_or_else(|| {
            tracing::warn!(id, %field, "edit for unknown record");
            Error::RecordNotFound(id.to_string())
        })?;

        if field == Field::Index {
            field.check(&value)?;
            let to = value.as_int().unwrap_or_default() as u32;
            let category = record.category.clone();
            return self.move_record_to(id, &category, to).map(|_| ());
        }

        if field == Field::Mark && self.schema.require(&record.category)?.marks_exempt {
            return Err(Error::MarksExempt(record.category.clone()));
        }

        let base = record.field(field);
        self.overlay.set_field(id, field, value, &base)?;
        Ok(())
    }

    /// Apply a move gesture.
    pub fn move_record(&mut self, event: &MoveEvent) -> Result<MoveOutcome> {
        self.ensure_idle()?;
        reorder::apply_move(&mut self.store, &mut self.overlay, event)
            .inspect_err(|e| tracing::warn!(error = %e, "move rejected"))
    }

    /// Move a record to a 1-based position in its category.
    pub fn move_record_to(&mut self, id: &str, category: &str, to_index: u32) -> Result<MoveOutcome> {
        self.ensure_idle()?;
        reorder::move_record(&mut self.store, &mut self.overlay, id, category, to_index)
            .inspect_err(|e| tracing::warn!(error = %e, "move rejected"))
    }

    /// Discard a draft. No backend call is made.
    pub fn remove_draft(&mut self, id: &str) -> Result<Record> {
        self.ensure_idle()?;
        let record = self
            .store
            .remove_local(id)
            .inspect_err(|e| tracing::warn!(error = %e, "draft removal rejected"))?;
        self.overlay.clear(id);
        reorder::renumber(&self.store, &mut self.overlay, &record.category)?;
        Ok(record)
    }

    /// Delete a record: drafts locally, persisted records through the backend.
    pub async fn delete(&mut self, id: &str, backend: &dyn Persistence) -> Result<DeleteOutcome> {
        self.ensure_idle()?;
        let record = self
            .store
            .get(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        if record.transient {
            self.remove_draft(id)?;
            return Ok(DeleteOutcome::Removed);
        }

        match backend.delete(id).await {
            Ok(()) => {
                self.forget(id)?;
                Ok(DeleteOutcome::Removed)
            }
            Err(error) => {
                tracing::warn!(id, %error, "delete rejected");
                Ok(DeleteOutcome::Rejected(RequestError::new(
                    id,
                    RequestKind::Delete,
                    &error,
                )))
            }
        }
    }

    /// Drop a persisted record the backend confirmed as deleted.
    pub fn forget(&mut self, id: &str) -> Result<()> {
        self.ensure_idle()?;
        let record = self
            .store
            .remove(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        self.overlay.clear(id);
        reorder::renumber(&self.store, &mut self.overlay, &record.category)?;
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Ordered records of a category with pending edits merged in.
    pub fn list_category(&self, category: &str) -> Result<Vec<Record>> {
        self.store.list_category(category, &self.overlay)
    }

    /// Get a base record.
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.store.get(id)
    }

    /// A record with pending edits merged in and its displayed index.
    pub fn effective(&self, id: &str) -> Option<Record> {
        let mut record = self.overlay.apply_to(self.store.get(id)?);
        if let Some(position) = self.store.position(id) {
            record.index = position;
        }
        Some(record)
    }

    /// All pending changes.
    pub fn pending(&self) -> OverlaySnapshot {
        self.overlay.snapshot()
    }

    /// Check if a commit would have anything to do.
    pub fn has_pending(&self) -> bool {
        !self.overlay.is_empty() || !self.store.transient_ids().is_empty()
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Start a commit: collect requests and block mutations.
    pub fn begin_commit(&mut self) -> Result<CommitPlan> {
        self.ensure_idle()?;
        self.phase = SyncPhase::Collecting;

        let (requests, validation_errors) =
            match sync::collect(&self.schema, &self.store, &self.overlay) {
                Ok(collected) => collected,
                Err(e) => {
                    self.phase = SyncPhase::Idle;
                    return Err(e);
                }
            };

        self.next_ticket += 1;
        let ticket = CommitTicket(self.next_ticket);
        self.outstanding = Some(ticket);
        self.phase = SyncPhase::Dispatching;

        tracing::info!(
            ticket = ticket.0,
            requests = requests.len(),
            held_back = validation_errors.len(),
            "commit started"
        );

        Ok(CommitPlan {
            ticket,
            requests,
            validation_errors,
        })
    }

    /// Finish a commit with the dispatched outcomes and an optional reload.
    ///
    /// A plan that is not the outstanding one is refused without touching
    /// any state.
    pub fn finish_commit(
        &mut self,
        plan: CommitPlan,
        outcomes: Vec<RequestOutcome>,
        reload: Option<std::result::Result<Vec<Record>, PersistenceError>>,
    ) -> Result<CommitReport> {
        if self.outstanding != Some(plan.ticket) {
            tracing::warn!(ticket = plan.ticket.0, "discarding results of a stale commit");
            return Err(Error::StaleCommit(plan.ticket.0));
        }
        self.phase = SyncPhase::Reconciling;

        let result = self.reconcile(plan, outcomes, reload);

        self.outstanding = None;
        self.phase = SyncPhase::Idle;
        result
    }

    fn reconcile(
        &mut self,
        plan: CommitPlan,
        outcomes: Vec<RequestOutcome>,
        reload: Option<std::result::Result<Vec<Record>, PersistenceError>>,
    ) -> Result<CommitReport> {
        let (saved_count, request_errors) =
            sync::apply_outcomes(&mut self.store, &mut self.overlay, outcomes)?;

        let reload_error = match reload {
            None => None,
            Some(Ok(records)) => self.reload(records).err().map(|e| e.to_string()),
            Some(Err(e)) => Some(e.to_string()),
        };
        if let Some(error) = &reload_error {
            tracing::warn!(%error, "reload after commit failed, keeping local state");
        }

        let report = CommitReport {
            saved_count,
            validation_errors: plan.validation_errors,
            request_errors,
            reload_error,
        };
        tracing::info!(
            ticket = plan.ticket.0,
            saved = report.saved_count,
            invalid = report.validation_errors.len(),
            failed = report.request_errors.len(),
            "commit finished"
        );
        Ok(report)
    }

    /// Give up on an outstanding commit, discarding its results.
    pub fn abort_commit(&mut self, ticket: CommitTicket) -> Result<()> {
        if self.outstanding != Some(ticket) {
            return Err(Error::StaleCommit(ticket.0));
        }
        tracing::info!(ticket = ticket.0, "commit aborted");
        self.outstanding = None;
        self.phase = SyncPhase::Idle;
        Ok(())
    }

    /// Run a whole commit against a backend.
    ///
    /// A commit with no requests makes no backend call at all, not even the
    /// reload. If the returned future is dropped before it completes, the
    /// commit is aborted: the editor becomes idle again and keeps every
    /// pending edit, whatever the backend did with the requests already sent.
    pub async fn commit(&mut self, backend: &dyn Persistence) -> Result<CommitReport> {
        let plan = self.begin_commit()?;
        if plan.requests.is_empty() {
            return self.finish_commit(plan, Vec::new(), None);
        }

        let mut guard = CommitGuard {
            ticket: plan.ticket,
            editor: self,
        };
        let outcomes = sync::dispatch(&plan, backend).await;
        let reload = backend.list_all().await;
        guard.editor.finish_commit(plan, outcomes, Some(reload))
    }
}

/// Aborts a commit whose future was dropped mid-flight.
struct CommitGuard<'a> {
    editor: &'a mut Editor,
    ticket: CommitTicket,
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if self.editor.outstanding == Some(self.ticket) {
            tracing::warn!(ticket = self.ticket.0, "commit cancelled before it finished");
            self.editor.outstanding = None;
            self.editor.phase = SyncPhase::Idle;
        }
    }
}

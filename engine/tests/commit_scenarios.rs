//! Commit behaviour against an in-memory backend.
//!
//! Each test drives a full editor session: load, edit, commit, inspect.

use assessment_engine::{
    dispatch, BackendCall, DraftDefaults, Editor, Error, Field, FieldValue, MemoryBackend,
    MoveEvent, NewQuestion, PendingChanges, Persistence, PersistenceError, Record, RecordId,
    Request, RequestKind, Schema, SyncPhase, ValidationIssue,
};
use async_trait::async_trait;
use std::time::Duration;

fn seed() -> Vec<Record> {
    vec![
        Record::persisted("q-1", "Social", "Community", "A", 1, 1),
        Record::persisted("q-2", "Social", "Labour", "B", 2, 2),
        Record::persisted("q-3", "Social", "Diversity", "C", 3, 3),
        Record::persisted("q-4", "Prerequisites", "Legal", "Registered?", 0, 1),
    ]
}

async fn session() -> (Editor, MemoryBackend) {
    let backend = MemoryBackend::with_records(seed());
    let mut editor = Editor::new(Schema::assessment()).unwrap();
    editor.load(backend.list_all().await.unwrap()).unwrap();
    (editor, backend)
}

fn valid_draft(text: &str) -> DraftDefaults {
    DraftDefaults {
        sub_category: "Community".into(),
        text: text.into(),
        mark: Some(2),
    }
}

fn order(editor: &Editor) -> Vec<String> {
    editor
        .list_category("Social")
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

// ============================================================================
// No-op Commit
// ============================================================================

#[tokio::test]
async fn empty_commit_issues_no_requests() {
    let (mut editor, backend) = session().await;
    let calls_before = backend.calls().len();

    let report = editor.commit(&backend).await.unwrap();

    assert!(report.is_noop());
    assert_eq!(report.saved_count, 0);
    assert!(!report.should_acknowledge());
    assert_eq!(backend.calls().len(), calls_before);
}

#[tokio::test]
async fn reverted_edit_is_a_noop() {
    let (mut editor, backend) = session().await;
    editor.set_field("q-1", Field::Text, "changed".into()).unwrap();
    editor.set_field("q-1", Field::Text, "A".into()).unwrap();
    editor.move_record(&MoveEvent::new("Social", 1, 3)).unwrap();
    editor.move_record(&MoveEvent::new("Social", 3, 1)).unwrap();

    let report = editor.commit(&backend).await.unwrap();

    assert!(report.is_noop());
    assert_eq!(backend.write_count(), 0);
}

// ============================================================================
// Validation Gate
// ============================================================================

#[tokio::test]
async fn draft_without_text_never_creates() {
    let (mut editor, backend) = session().await;
    let draft = editor
        .add_draft(
            "Social",
            DraftDefaults {
                sub_category: "Community".into(),
                text: "   ".into(),
                mark: Some(5),
            },
        )
        .unwrap();

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(backend.write_count(), 0);
    assert_eq!(report.validation_errors.len(), 1);
    assert_eq!(report.validation_errors[0].id, draft);
    assert_eq!(
        report.validation_errors[0].issues,
        vec![ValidationIssue::EmptyText]
    );
    // The draft stays editable
    assert!(editor.record(&draft).unwrap().transient);
    editor.set_field(&draft, Field::Text, "Now filled".into()).unwrap();
}

#[tokio::test]
async fn one_valid_one_invalid_draft() {
    let (mut editor, backend) = session().await;
    editor.add_draft("Social", valid_draft("Complete")).unwrap();
    let invalid = editor.add_draft("Social", DraftDefaults::default()).unwrap();

    let report = editor.commit(&backend).await.unwrap();

    let creates: Vec<_> = backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, BackendCall::Create { .. }))
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(report.saved_count, 1);
    assert_eq!(report.validation_errors.len(), 1);
    assert!(report.request_errors.is_empty());
    assert!(report.should_acknowledge());
    assert!(report.has_failures());

    // The invalid draft survives the reload at the end of the category
    assert_eq!(order(&editor).last(), Some(&invalid));
    assert_eq!(editor.list_category("Social").unwrap().len(), 5);
}

#[tokio::test]
async fn exempt_category_submits_zero_mark() {
    let (mut editor, backend) = session().await;
    editor
        .add_draft(
            "Prerequisites",
            DraftDefaults {
                sub_category: "Safety".into(),
                text: "Safety plan in place?".into(),
                mark: None,
            },
        )
        .unwrap();

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 1);
    let created = backend
        .records()
        .into_iter()
        .find(|r| r.text == "Safety plan in place?")
        .unwrap();
    assert_eq!(created.mark, Some(0));
    assert_eq!(created.index, 2);
}

// ============================================================================
// Overlay Clears on Success, Survives on Failure
// ============================================================================

#[tokio::test]
async fn successful_update_clears_overlay() {
    let (mut editor, backend) = session().await;
    editor.set_field("q-2", Field::Text, "B2".into()).unwrap();

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 1);
    assert!(editor.overlay().changes("q-2").is_none());
    assert_eq!(editor.record("q-2").unwrap().text, "B2");
    assert!(backend.calls().contains(&BackendCall::Update {
        id: "q-2".into(),
        changes: [(Field::Text, FieldValue::from("B2"))].into_iter().collect(),
    }));
}

#[tokio::test]
async fn failed_update_keeps_overlay() {
    let (mut editor, backend) = session().await;
    editor.set_field("q-2", Field::Text, "B2".into()).unwrap();
    let before = editor.overlay().changes("q-2").cloned();
    backend.fail_on("q-2");

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 0);
    assert_eq!(report.request_errors.len(), 1);
    assert_eq!(report.request_errors[0].id, "q-2");
    assert_eq!(report.request_errors[0].kind, RequestKind::Update);
    assert_eq!(editor.overlay().changes("q-2").cloned(), before);
    assert_eq!(editor.effective("q-2").unwrap().text, "B2");
}

#[tokio::test]
async fn retry_after_failure() {
    let (mut editor, backend) = session().await;
    editor.set_field("q-1", Field::Mark, FieldValue::Int(9)).unwrap();
    backend.fail_on("q-1");
    editor.commit(&backend).await.unwrap();

    backend.recover("q-1");
    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 1);
    assert!(!editor.has_pending());
    assert_eq!(editor.record("q-1").unwrap().mark, Some(9));
}

#[tokio::test]
async fn partial_failure_does_not_roll_back_others() {
    let (mut editor, backend) = session().await;
    editor.set_field("q-1", Field::Text, "A2".into()).unwrap();
    editor.set_field("q-3", Field::Text, "C2".into()).unwrap();
    backend.fail_on("q-3");

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 1);
    assert_eq!(report.request_errors.len(), 1);
    assert!(!editor.overlay().has("q-1"));
    assert!(editor.overlay().has("q-3"));
    let stored = backend.records();
    assert_eq!(stored.iter().find(|r| r.id == "q-1").unwrap().text, "A2");
    assert_eq!(stored.iter().find(|r| r.id == "q-3").unwrap().text, "C");
}

// ============================================================================
// Reorder Through Commit
// ============================================================================

#[tokio::test]
async fn reorder_commits_only_changed_indices() {
    let (mut editor, backend) = session().await;
    editor.move_record(&MoveEvent::new("Social", 1, 3)).unwrap();

    let pending = editor.pending();
    assert_eq!(pending.len(), 3);
    assert!(pending.entries.iter().all(|e| e.is_index_only()));

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 3);
    assert_eq!(order(&editor), vec!["q-2", "q-3", "q-1"]);
    assert!(!editor.has_pending());
    let index_of = |id: &str| backend.records().iter().find(|r| r.id == id).unwrap().index;
    assert_eq!(index_of("q-2"), 1);
    assert_eq!(index_of("q-3"), 2);
    assert_eq!(index_of("q-1"), 3);
}

#[tokio::test]
async fn failed_reorder_keeps_displayed_order() {
    let (mut editor, backend) = session().await;
    editor.move_record(&MoveEvent::new("Social", 3, 1)).unwrap();
    backend.fail_on("q-3");

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 2);
    // The reload brought back q-3's old index; its pending move still wins
    assert_eq!(order(&editor), vec!["q-3", "q-1", "q-2"]);
    assert_eq!(
        editor.overlay().get("q-3", Field::Index),
        Some(&FieldValue::Int(1))
    );
}

#[tokio::test]
async fn draft_position_travels_in_create() {
    let (mut editor, backend) = session().await;
    let draft = editor.add_draft("Social", valid_draft("New first")).unwrap();
    editor.move_record_to(&draft, "Social", 1).unwrap();

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 4);
    let updates = backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, BackendCall::Update { .. }))
        .count();
    assert_eq!(updates, 3);
    let created = backend
        .records()
        .into_iter()
        .find(|r| r.text == "New first")
        .unwrap();
    assert_eq!(created.index, 1);
    assert_eq!(order(&editor)[0], created.id);
}

// ============================================================================
// Split Commit
// ============================================================================

#[tokio::test]
async fn split_commit_releases_between_phases() {
    let (mut editor, backend) = session().await;
    editor.set_field("q-1", Field::Text, "A2".into()).unwrap();
    editor.add_draft("Social", valid_draft("Draft")).unwrap();

    let plan = editor.begin_commit().unwrap();
    assert_eq!(editor.phase(), SyncPhase::Dispatching);
    assert_eq!(plan.requests.len(), 2);
    assert!(matches!(plan.requests[0], Request::Create(_)));
    assert!(matches!(plan.requests[1], Request::Update(_)));

    let outcomes = dispatch(&plan, &backend).await;
    let reload = backend.list_all().await;
    let report = editor.finish_commit(plan, outcomes, Some(reload)).unwrap();

    assert_eq!(report.saved_count, 2);
    assert_eq!(editor.phase(), SyncPhase::Idle);
    assert_eq!(editor.list_category("Social").unwrap().len(), 4);
}

#[tokio::test]
async fn created_draft_survives_seeded_id_gaps() {
    let backend = MemoryBackend::with_records(vec![
        Record::persisted("q-1", "Social", "Community", "a", 1, 1),
        Record::persisted("q-3", "Social", "Community", "c", 1, 2),
    ]);
    let mut editor = Editor::new(Schema::assessment()).unwrap();
    editor.load(backend.list_all().await.unwrap()).unwrap();
    editor.add_draft("Social", valid_draft("new")).unwrap();

    let report = editor.commit(&backend).await.unwrap();

    assert_eq!(report.saved_count, 1);
    let listed: Vec<(String, String)> = editor
        .list_category("Social")
        .unwrap()
        .into_iter()
        .map(|r| (r.id, r.text))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("q-1".to_string(), "a".to_string()),
            ("q-3".to_string(), "c".to_string()),
            ("q-4".to_string(), "new".to_string()),
        ]
    );
}

// ============================================================================
// Cancellation
// ============================================================================

/// Backend whose writes never answer.
struct Unresponsive;

#[async_trait]
impl Persistence for Unresponsive {
    async fn list_all(&self) -> Result<Vec<Record>, PersistenceError> {
        Ok(seed())
    }

    async fn create(&self, _: &str, _: &NewQuestion) -> Result<RecordId, PersistenceError> {
        std::future::pending().await
    }

    async fn update(&self, _: &str, _: &PendingChanges) -> Result<(), PersistenceError> {
        std::future::pending().await
    }

    async fn delete(&self, _: &str) -> Result<(), PersistenceError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn dropped_commit_releases_the_editor() {
    let (mut editor, backend) = session().await;
    editor.set_field("q-1", Field::Text, "A2".into()).unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(50), editor.commit(&Unresponsive))
        .await
        .is_err();
    assert!(timed_out);

    assert!(!editor.is_committing());
    assert_eq!(editor.phase(), SyncPhase::Idle);
    assert_eq!(editor.outstanding_ticket(), None);
    assert_eq!(
        editor.overlay().get("q-1", Field::Text),
        Some(&FieldValue::from("A2"))
    );

    // Edits and a fresh commit work again
    editor.set_field("q-2", Field::Text, "B2".into()).unwrap();
    let report = editor.commit(&backend).await.unwrap();
    assert_eq!(report.saved_count, 2);
    assert!(!editor.has_pending());
}

#[tokio::test]
async fn host_can_abort_its_outstanding_commit() {
    let (mut editor, _) = session().await;
    editor.set_field("q-1", Field::Text, "A2".into()).unwrap();

    let plan = editor.begin_commit().unwrap();
    assert_eq!(editor.outstanding_ticket(), Some(plan.ticket));
    assert_eq!(
        editor.set_field("q-2", Field::Text, "B2".into()),
        Err(Error::CommitInProgress)
    );

    let ticket = editor.outstanding_ticket().unwrap();
    editor.abort_commit(ticket).unwrap();
    assert!(!editor.is_committing());
    editor.set_field("q-2", Field::Text, "B2".into()).unwrap();
}

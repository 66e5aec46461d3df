//! Error types for the assessment engine.
//!
//! Everything in here is a contract violation by the calling layer. Problems
//! the user can recover from (incomplete drafts, rejected requests) are
//! reported as data inside [`crate::CommitReport`] instead.

use crate::{CategoryName, RecordId};
use thiserror::Error;

/// All possible errors from the assessment engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("category not found: {0}")]
    CategoryNotFound(CategoryName),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("record id already in use: {0}")]
    DuplicateRecord(RecordId),

    // Identity errors
    #[error("record is not a draft: {0}")]
    NotTransient(RecordId),

    #[error("record {id} belongs to '{actual}', cannot move within '{requested}'")]
    CrossCategoryMove {
        id: RecordId,
        actual: CategoryName,
        requested: CategoryName,
    },

    #[error("position {position} is out of range for '{category}' (1..={len})")]
    PositionOutOfRange {
        category: CategoryName,
        position: u32,
        len: usize,
    },

    #[error("category '{0}' does not take marks")]
    MarksExempt(CategoryName),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    // Commit lifecycle errors
    #[error("a commit is already in flight")]
    CommitInProgress,

    #[error("commit ticket {0} does not match the outstanding commit")]
    StaleCommit(u64),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

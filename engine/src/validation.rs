//! Validation rules for drafts.
//!
//! Only drafts are validated, and only at commit time. Persisted records are
//! trusted as-is and their updates are never re-validated locally.

use crate::{CategoryName, CategorySchema, Field, NewQuestion, Record, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One reason a draft cannot be persisted yet.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", content = "value", rename_all = "camelCase")]
pub enum ValidationIssue {
    #[error("question text is empty")]
    EmptyText,

    #[error("no subcategory selected")]
    MissingSubCategory,

    #[error("subcategory '{0}' is not offered by this category")]
    UnknownSubCategory(String),

    #[error("mark is not a number")]
    MissingMark,
}

impl ValidationIssue {
    /// The field the issue should be displayed next to.
    pub fn field(&self) -> Field {
        match self {
            ValidationIssue::EmptyText => Field::Text,
            ValidationIssue::MissingSubCategory | ValidationIssue::UnknownSubCategory(_) => {
                Field::SubCategory
            }
            ValidationIssue::MissingMark => Field::Mark,
        }
    }
}

/// All issues found for one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub id: RecordId,
    pub category: CategoryName,
    pub issues: Vec<ValidationIssue>,
}

/// Check a draft's effective values and build its create payload.
///
/// Categories exempt from marks always submit `mark = 0`, whatever the draft
/// holds.
pub fn validate_draft(
    record: &Record,
    category: &CategorySchema,
) -> Result<NewQuestion, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if record.text.trim().is_empty() {
        issues.push(ValidationIssue::EmptyText);
    }

    if record.sub_category.trim().is_empty() {
        issues.push(ValidationIssue::MissingSubCategory);
    } else if !category.has_sub_category(&record.sub_category) {
        issues.push(ValidationIssue::UnknownSubCategory(
            record.sub_category.clone(),
        ));
    }

    let mark = if category.marks_exempt {
        Some(0)
    } else {
        record.mark
    };
    if mark.is_none() {
        issues.push(ValidationIssue::MissingMark);
    }

    match mark {
        Some(mark) if issues.is_empty() => Ok(NewQuestion {
            category: record.category.clone(),
            sub_category: record.sub_category.clone(),
            text: record.text.clone(),
            mark,
            index: record.index,
        }),
        _ => Err(issues),
    }
}

//! Record types for assessment questions.

use crate::{error::Result, CategoryName, Error, RecordId};
use serde::{Deserialize, Serialize};

/// An editable field of a [`Record`].
///
/// `id`, `category` and `transient` are deliberately absent: the first two are
/// fixed at creation and the last one is owned by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    SubCategory,
    Text,
    Mark,
    Index,
}

impl Field {
    /// All editable fields, in wire order.
    pub const ALL: [Field; 4] = [Field::SubCategory, Field::Text, Field::Mark, Field::Index];

    /// Check whether a value has the right shape for this field.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Field::SubCategory | Field::Text, FieldValue::String(_)) => true,
            (Field::Mark, FieldValue::Int(_) | FieldValue::Null) => true,
            (Field::Index, FieldValue::Int(n)) => *n >= 1 && *n <= u32::MAX as i64,
            _ => false,
        }
    }

    /// Same as [`Field::accepts`], reported as a typed error.
    pub fn check(&self, value: &FieldValue) -> Result<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.to_string(),
                expected: self.expected().to_string(),
                got: value.type_name().to_string(),
            })
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Field::SubCategory | Field::Text => "String",
            Field::Mark => "Int or Null",
            Field::Index => "positive Int",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::SubCategory => write!(f, "subCategory"),
            Field::Text => write!(f, "text"),
            Field::Mark => write!(f, "mark"),
            Field::Index => write!(f, "index"),
        }
    }
}

/// A value staged for a [`Field`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Null,
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "String",
            FieldValue::Int(_) => "Int",
            FieldValue::Null => "Null",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map(FieldValue::Int).unwrap_or(FieldValue::Null)
    }
}

/// One assessment question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Persisted id from the backend, or a draft id generated locally
    pub id: RecordId,
    /// Category this question belongs to
    pub category: CategoryName,
    /// Subcategory from the category's enumeration (empty when unselected)
    pub sub_category: String,
    /// Statement text
    pub text: String,
    /// Score weight; `None` when the input is not a number
    pub mark: Option<i64>,
    /// 1-based position within the category
    pub index: u32,
    /// True until the record has been persisted once
    #[serde(default)]
    pub transient: bool,
}

impl Record {
    /// Create a record as received from the backend.
    pub fn persisted(
        id: impl Into<RecordId>,
        category: impl Into<CategoryName>,
        sub_category: impl Into<String>,
        text: impl Into<String>,
        mark: i64,
        index: u32,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            sub_category: sub_category.into(),
            text: text.into(),
            mark: Some(mark),
            index,
            transient: false,
        }
    }

    /// Create a local draft at the given position.
    pub fn draft(
        id: impl Into<RecordId>,
        category: impl Into<CategoryName>,
        index: u32,
        defaults: DraftDefaults,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            sub_category: defaults.sub_category,
            text: defaults.text,
            mark: defaults.mark,
            index,
            transient: true,
        }
    }

    /// Read one editable field.
    pub fn field(&self, field: Field) -> FieldValue {
        match field {
            Field::SubCategory => FieldValue::String(self.sub_category.clone()),
            Field::Text => FieldValue::String(self.text.clone()),
            Field::Mark => self.mark.into(),
            Field::Index => FieldValue::Int(self.index as i64),
        }
    }

    /// Write one editable field.
    pub fn set_field(&mut self, field: Field, value: FieldValue) -> Result<()> {
        field.check(&value)?;
        match (field, value) {
            (Field::SubCategory, FieldValue::String(s)) => self.sub_category = s,
            (Field::Text, FieldValue::String(s)) => self.text = s,
            (Field::Mark, FieldValue::Int(n)) => self.mark = Some(n),
            (Field::Mark, FieldValue::Null) => self.mark = None,
            (Field::Index, FieldValue::Int(n)) => self.index = n as u32,
            // `check` rejected every other combination
            _ => {}
        }
        Ok(())
    }
}

/// Initial values for a freshly added draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftDefaults {
    pub sub_category: String,
    pub text: String,
    pub mark: Option<i64>,
}

/// Payload of a create request: the draft's effective values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub category: CategoryName,
    pub sub_category: String,
    pub text: String,
    pub mark: i64,
    pub index: u32,
}

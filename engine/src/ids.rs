//! Draft id generation.
//!
//! Drafts need an identity before the backend has assigned one. Ids combine a
//! monotonically increasing counter with a random suffix, so two generators
//! (e.g. two browser tabs on the same catalog) practically never collide and
//! one generator never repeats itself.

use crate::RecordId;
use serde::{Deserialize, Serialize};

/// Default prefix for draft ids.
pub const DRAFT_PREFIX: &str = "draft";

/// Generator for draft record ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftIdGenerator {
    prefix: String,
    /// Number of ids handed out so far
    counter: u64,
}

impl DraftIdGenerator {
    /// Create a generator using [`DRAFT_PREFIX`].
    pub fn new() -> Self {
        Self::with_prefix(DRAFT_PREFIX)
    }

    /// Create a generator with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }

    /// Number of ids generated so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Produce the next id.
    pub fn next_id(&mut self) -> RecordId {
        self.counter += 1;
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", self.prefix, self.counter, &suffix[..8])
    }

    /// Produce the next id that `taken` does not reject.
    pub fn next_unused(&mut self, taken: impl Fn(&str) -> bool) -> RecordId {
        loop {
            let id = self.next_id();
            if !taken(&id) {
                return id;
            }
        }
    }
}

impl Default for DraftIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

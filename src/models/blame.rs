//! Blame records.
//!
//! Provides per-line author attribution as reported by the annotate tool.
//! Records are positional: the record at index `i` describes source line `i + 1`.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Blame information for a single line.
///
/// Either all three fields are set, or none is (a placeholder emitted for
/// files the annotate tool refused to blame).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlameLine {
    /// Changeset that last modified this line
    pub revision: Option<String>,
    /// Committer of that changeset
    pub author: Option<String>,
    /// When that changeset was committed
    pub date: Option<DateTime<Utc>>,
}

impl BlameLine {
    pub fn new(revision: impl Into<String>, author: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            revision: Some(revision.into()),
            author: Some(author.into()),
            date: Some(date),
        }
    }

    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.revision.is_none() && self.author.is_none() && self.date.is_none()
    }

    /// `count` placeholder records, used to keep the length invariant for skipped files.
    pub fn placeholders(count: usize) -> Vec<Self> {
        vec![Self::placeholder(); count]
    }
}

//! Immutable table storage.
//!
//! Tables are persistent values: every mutation returns a new [`Table`]
//! together with a [`WriteReport`] describing what changed. The previous
//! version stays valid and unchanged.

mod table;

pub use table::{IndexDef, Table};

use serde::Serialize;

use crate::error::{ReqlError, Result};
use crate::types::Datum;

/// What to do when an inserted document's `id` already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Skip the document and count an error.
    #[default]
    Error,
    /// Shallow-merge the document into the existing row.
    Update,
    /// Substitute the document for the existing row.
    Replace,
}

impl ConflictPolicy {
    /// Parses the `conflict` option value.
    ///
    /// # Errors
    ///
    /// Returns a runtime error for unknown policy names.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "error" => Ok(ConflictPolicy::Error),
            "update" => Ok(ConflictPolicy::Update),
            "replace" => Ok(ConflictPolicy::Replace),
            other => Err(ReqlError::Runtime(format!(
                "Conflict option `{other}` unrecognized (options are \"error\", \"replace\" and \"update\")."
            ))),
        }
    }
}

/// Before/after pair for one affected row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub old_val: Datum,
    pub new_val: Datum,
}

impl Change {
    /// Builds a change record.
    #[must_use]
    pub fn new(old_val: Datum, new_val: Datum) -> Self {
        Change { old_val, new_val }
    }
}

/// Summary of a write, in the shape the server returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteReport {
    pub inserted: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub errors: usize,
    pub changes: Vec<Change>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generated_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
}

impl WriteReport {
    /// Folds `other` into this report, summing counts and appending lists.
    pub fn merge(&mut self, other: WriteReport) {
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.deleted += other.deleted;
        self.errors += other.errors;
        self.changes.extend(other.changes);
        self.generated_keys.extend(other.generated_keys);
        if self.first_error.is_none() {
            self.first_error = other.first_error;
        }
    }

    /// Converts the report into the object a query returns.
    #[must_use]
    pub fn to_datum(&self) -> Datum {
        serde_json::to_value(self).map_or(Datum::Null, Datum::from)
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.errors += 1;
        if self.first_error.is_none() {
            self.first_error = Some(message);
        }
    }
}

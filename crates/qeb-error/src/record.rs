// SPDX-License-Identifier: MIT OR Apache-2.0
//! The error record itself and the fluent builder that produces it.

use crate::ErrorClassification;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to the fault an error record was built from.
pub type SharedFault = Arc<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Location / PathSegment
// ---------------------------------------------------------------------------

/// A 1-based `(line, column)` position in the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

impl Location {
    /// Create a location from a line and column pair.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One step of a response path: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PathSegment {
    /// A named field.
    Field(String),
    /// An index into a list.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

// ---------------------------------------------------------------------------
// ErrorRecord
// ---------------------------------------------------------------------------

/// Immutable, structured description of one failure.
///
/// Records are cheap to clone; the underlying fault is shared rather than
/// copied. Use [`ErrorBuilder`] to create one, or the `with_*` helpers to
/// derive a modified copy.
#[derive(Clone)]
pub struct ErrorRecord {
    message: String,
    classification: ErrorClassification,
    locations: Vec<Location>,
    path: Option<Vec<PathSegment>>,
    underlying_fault: Option<SharedFault>,
    extensions: BTreeMap<String, serde_json::Value>,
}

impl ErrorRecord {
    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure category.
    pub fn classification(&self) -> ErrorClassification {
        self.classification
    }

    /// Positions in the query text; empty when not applicable.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Response path of the failing field, if any.
    pub fn path(&self) -> Option<&[PathSegment]> {
        self.path.as_deref()
    }

    /// The originating fault. Never serialized.
    pub fn underlying_fault(&self) -> Option<&SharedFault> {
        self.underlying_fault.as_ref()
    }

    /// Open-ended structured metadata.
    pub fn extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extensions
    }

    /// Look up a single extension value.
    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions.get(key)
    }

    /// Copy of this record with a different message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Copy of this record with one extension added or replaced.
    ///
    /// Values that fail to serialise are skipped.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.extensions.insert(key.into(), v);
        }
        self
    }

    /// Copy of this record with one extension removed.
    #[must_use]
    pub fn without_extension(mut self, key: &str) -> Self {
        self.extensions.remove(key);
        self
    }

    fn same_fault(&self, other: &Self) -> bool {
        match (&self.underlying_fault, &other.underlying_fault) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::eq(
                Arc::as_ptr(a) as *const (),
                Arc::as_ptr(b) as *const (),
            ),
            _ => false,
        }
    }
}

/// Records compare equal when every field matches and both point at the
/// same fault instance (or neither has one).
impl PartialEq for ErrorRecord {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.classification == other.classification
            && self.locations == other.locations
            && self.path == other.path
            && self.extensions == other.extensions
            && self.same_fault(other)
    }
}

impl fmt::Debug for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ErrorRecord");
        d.field("message", &self.message);
        d.field("classification", &self.classification);
        if !self.locations.is_empty() {
            d.field("locations", &self.locations);
        }
        if let Some(ref path) = self.path {
            d.field("path", path);
        }
        if let Some(ref fault) = self.underlying_fault {
            d.field("underlying_fault", &fault.to_string());
        }
        if !self.extensions.is_empty() {
            d.field("extensions", &self.extensions);
        }
        d.finish()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(first) = self.locations.first() {
            write!(f, " at {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorRecord {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.underlying_fault
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// ErrorBuilder
// ---------------------------------------------------------------------------

/// Fluent construction of an [`ErrorRecord`].
///
/// ```
/// use qeb_error::{ErrorBuilder, ErrorClassification, Location};
///
/// let record = ErrorBuilder::new("unexpected token")
///     .set_classification(ErrorClassification::QueryStructure)
///     .add_location(Location::new(3, 5))
///     .set_extension("token", "}")
///     .build();
/// assert_eq!(record.locations(), &[Location::new(3, 5)]);
/// ```
#[derive(Clone)]
pub struct ErrorBuilder {
    record: ErrorRecord,
}

impl ErrorBuilder {
    /// Start a builder with the given message and the
    /// [`Unexpected`](ErrorClassification::Unexpected) classification.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            record: ErrorRecord {
                message: message.into(),
                classification: ErrorClassification::Unexpected,
                locations: Vec::new(),
                path: None,
                underlying_fault: None,
                extensions: BTreeMap::new(),
            },
        }
    }

    /// Start from an existing record, keeping every field.
    pub fn from_record(record: &ErrorRecord) -> Self {
        Self {
            record: record.clone(),
        }
    }

    /// Replace the message.
    #[must_use]
    pub fn set_message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Replace the classification.
    #[must_use]
    pub fn set_classification(mut self, classification: ErrorClassification) -> Self {
        self.record.classification = classification;
        self
    }

    /// Append a source location.
    #[must_use]
    pub fn add_location(mut self, location: Location) -> Self {
        self.record.locations.push(location);
        self
    }

    /// Drop every location added so far.
    #[must_use]
    pub fn clear_locations(mut self) -> Self {
        self.record.locations.clear();
        self
    }

    /// Set the response path.
    #[must_use]
    pub fn set_path(mut self, path: impl IntoIterator<Item = PathSegment>) -> Self {
        self.record.path = Some(path.into_iter().collect());
        self
    }

    /// Attach the originating fault.
    #[must_use]
    pub fn set_underlying_fault(mut self, fault: SharedFault) -> Self {
        self.record.underlying_fault = Some(fault);
        self
    }

    /// Add or replace an extension entry.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    #[must_use]
    pub fn set_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.record.extensions.insert(key.into(), v);
        }
        self
    }

    /// Remove an extension entry if present.
    #[must_use]
    pub fn remove_extension(mut self, key: &str) -> Self {
        self.record.extensions.remove(key);
        self
    }

    /// Finish building.
    pub fn build(self) -> ErrorRecord {
        self.record
    }
}

impl fmt::Debug for ErrorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorBuilder").field(&self.record).finish()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! The immutable outcome of one request.

use qeb_error::{ErrorRecord, WireError};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Outcome of a request: a data payload, error records, or both.
///
/// The boundary itself only ever produces the error form through
/// [`QueryResult::from_errors`]; data and partial results come from
/// downstream executors.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    data: Option<serde_json::Value>,
    errors: Vec<ErrorRecord>,
    extensions: BTreeMap<String, serde_json::Value>,
}

impl QueryResult {
    /// Successful result carrying `data`.
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Error-only result.
    pub fn from_errors(errors: Vec<ErrorRecord>) -> Self {
        Self {
            data: None,
            errors,
            extensions: BTreeMap::new(),
        }
    }

    /// Data plus the field errors encountered while producing it.
    pub fn partial(data: serde_json::Value, errors: Vec<ErrorRecord>) -> Self {
        Self {
            data: Some(data),
            errors,
            extensions: BTreeMap::new(),
        }
    }

    /// Copy of this result with a response-level extension set.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.extensions.insert(key.into(), v);
        }
        self
    }

    /// Payload, if any.
    pub fn data_value(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Error records in the order they were produced.
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Response-level extensions.
    pub fn extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extensions
    }

    /// `true` when there is no data, only errors.
    pub fn is_error(&self) -> bool {
        self.data.is_none() && !self.errors.is_empty()
    }

    /// `true` when there is data and no errors.
    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.errors.is_empty()
    }
}

#[derive(Serialize)]
struct WireResult<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<WireError>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extensions: &'a BTreeMap<String, serde_json::Value>,
}

/// `{ "data"?, "errors"?, "extensions"? }`
impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireResult {
            data: self.data.as_ref(),
            errors: self.errors.iter().map(WireError::from).collect(),
            extensions: &self.extensions,
        }
        .serialize(serializer)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialisable wire shape of an [`ErrorRecord`].
//!
//! The wire shape is what a transport writes into the `errors` array of a
//! response. It omits the classification field and the
//! underlying fault; the classification travels as `extensions.code` when the
//! error handler is configured to expose it.

use crate::{ErrorBuilder, ErrorClassification, ErrorRecord, Location, PathSegment};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Extension key carrying the classification code.
pub const CODE_EXTENSION: &str = "code";

/// `{ "message", "locations"?, "path"?, "extensions"? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WireError {
    /// Human-readable message.
    pub message: String,
    /// Source positions; omitted when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    /// Response path; omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// Extension map; omitted when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeMap<String, serde_json::Value>>,
}

impl From<&ErrorRecord> for WireError {
    fn from(record: &ErrorRecord) -> Self {
        Self {
            message: record.message().to_string(),
            locations: (!record.locations().is_empty()).then(|| record.locations().to_vec()),
            path: record.path().map(<[PathSegment]>::to_vec),
            extensions: (!record.extensions().is_empty()).then(|| record.extensions().clone()),
        }
    }
}

/// Rebuild a record from its wire shape.
///
/// The classification is recovered from `extensions.code` when it holds a
/// known code, otherwise it falls back to
/// [`Unexpected`](ErrorClassification::Unexpected). The underlying fault is
/// lost.
impl From<WireError> for ErrorRecord {
    fn from(wire: WireError) -> Self {
        let classification = wire
            .extensions
            .as_ref()
            .and_then(|ext| ext.get(CODE_EXTENSION))
            .and_then(serde_json::Value::as_str)
            .and_then(ErrorClassification::from_code)
            .unwrap_or(ErrorClassification::Unexpected);

        let mut builder = ErrorBuilder::new(wire.message).set_classification(classification);
        for loc in wire.locations.unwrap_or_default() {
            builder = builder.add_location(loc);
        }
        if let Some(path) = wire.path {
            builder = builder.set_path(path);
        }
        for (k, v) in wire.extensions.unwrap_or_default() {
            builder = builder.set_extension(k, v);
        }
        builder.build()
    }
}

impl Serialize for ErrorRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireError::from(self).serialize(serializer)
    }
}

impl ErrorClassification {
    /// Parse a code produced by [`code`](Self::code).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure categories attached to every [`ErrorRecord`](crate::ErrorRecord).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which failure category produced an error record.
///
/// The set is closed: anything the boundary does not recognise ends up as
/// [`Unexpected`](Self::Unexpected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClassification {
    /// The query text or its structure is invalid (syntax, validation).
    QueryStructure,
    /// A scalar value could not be coerced to or from its declared type.
    ScalarCoercion,
    /// An input object value could not be coerced to its declared type.
    InputObjectCoercion,
    /// Catch-all for faults nobody anticipated.
    Unexpected,
}

impl ErrorClassification {
    /// Every classification, in taxonomy order.
    pub const ALL: [ErrorClassification; 4] = [
        Self::QueryStructure,
        Self::ScalarCoercion,
        Self::InputObjectCoercion,
        Self::Unexpected,
    ];

    /// Stable upper-snake code surfaced in `extensions.code` (e.g. `"SCALAR_COERCION"`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryStructure => "QUERY_STRUCTURE",
            Self::ScalarCoercion => "SCALAR_COERCION",
            Self::InputObjectCoercion => "INPUT_OBJECT_COERCION",
            Self::Unexpected => "UNEXPECTED",
        }
    }

    /// `true` for faults the caller caused and can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Unexpected)
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::QueryStructure => "query-structure",
            Self::ScalarCoercion => "scalar-coercion",
            Self::InputObjectCoercion => "input-object-coercion",
            Self::Unexpected => "unexpected",
        };
        f.write_str(s)
    }
}

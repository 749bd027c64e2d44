// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fault kinds raised by pipeline stages and the ordered rules that classify
//! them.
//!
//! A [`Fault`] is what a stage returns instead of a result. The
//! [`NormalizationStage`](crate::NormalizationStage) turns it into error
//! records by asking [`classify`] which [`FaultRule`] applies. Rules are
//! evaluated in [`FaultRule::PRIORITY`] order and the first match wins;
//! [`FaultRule::CatchAll`] matches everything, so classification is total.

use crate::cancel::CancellationReason;
use qeb_error::{ErrorClassification, ErrorRecord, Location};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Fault
// ---------------------------------------------------------------------------

/// A failure raised by a pipeline stage.
#[derive(Debug, Error)]
pub enum Fault {
    /// The query is structurally invalid; the parser or validator already
    /// produced the error records.
    #[error("{message}")]
    Query {
        /// Summary of the failure.
        message: String,
        /// Fully formed records to surface as-is.
        errors: Vec<ErrorRecord>,
    },

    /// The query text could not be tokenised or parsed.
    #[error("{message}")]
    Syntax {
        /// Parser message.
        message: String,
        /// Position of the offending token, when the parser knows it.
        location: Option<Location>,
    },

    /// A scalar value could not be coerced.
    #[error("{message}")]
    ScalarCoercion {
        /// Coercion message.
        message: String,
        /// Name of the scalar type, if known.
        type_name: Option<String>,
    },

    /// An input object value could not be coerced.
    #[error("{message}")]
    InputObjectCoercion {
        /// Coercion message.
        message: String,
        /// Name of the input object type, if known.
        type_name: Option<String>,
    },

    /// The request was cancelled while a stage was running.
    #[error("request cancelled{}", .reason.map(|r| format!(": {}", r.description())).unwrap_or_default())]
    Cancelled {
        /// Why, if the canceller said.
        reason: Option<CancellationReason>,
    },

    /// A stage panicked; the payload text is kept for server-side logs.
    #[error("stage panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The chain finished without faulting but no stage set a result.
    #[error("pipeline completed without producing a result")]
    NoResult,

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Fault {
    /// Query-structure fault carrying pre-built records.
    pub fn query(message: impl Into<String>, errors: Vec<ErrorRecord>) -> Self {
        Self::Query {
            message: message.into(),
            errors,
        }
    }

    /// Syntax fault at a known position.
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::Syntax {
            message: message.into(),
            location: Some(Location::new(line, column)),
        }
    }

    /// Scalar-coercion fault.
    pub fn scalar(message: impl Into<String>) -> Self {
        Self::ScalarCoercion {
            message: message.into(),
            type_name: None,
        }
    }

    /// Input-object-coercion fault.
    pub fn input_object(message: impl Into<String>) -> Self {
        Self::InputObjectCoercion {
            message: message.into(),
            type_name: None,
        }
    }

    /// Wrap any error as an unrecognised fault.
    pub fn other(err: impl Into<anyhow::Error>) -> Self {
        Self::Other(err.into())
    }

    /// The fault's own message (its display text).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Source position, for the fault kinds that carry one.
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Syntax { location, .. } => *location,
            _ => None,
        }
    }

    /// Pre-built records, for the fault kinds that carry them.
    pub fn prebuilt_errors(&self) -> &[ErrorRecord] {
        match self {
            Self::Query { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Syntax { .. } => "syntax",
            Self::ScalarCoercion { .. } => "scalar_coercion",
            Self::InputObjectCoercion { .. } => "input_object_coercion",
            Self::Cancelled { .. } => "cancelled",
            Self::Panicked { .. } => "panicked",
            Self::NoResult => "no_result",
            Self::Other(_) => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// FaultRule
// ---------------------------------------------------------------------------

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultRule {
    /// Query fault with at least one pre-built record: reuse them verbatim.
    PrebuiltErrors,
    /// Syntax fault with a known position: one record with that location.
    SyntaxWithLocation,
    /// Scalar-coercion fault: one record with the fault message.
    ScalarCoercion,
    /// Input-object-coercion fault: one record with the fault message.
    InputObjectCoercion,
    /// Anything else: one record with the handler's generic message.
    CatchAll,
}

impl FaultRule {
    /// Evaluation order, most specific first.
    pub const PRIORITY: [FaultRule; 5] = [
        Self::PrebuiltErrors,
        Self::SyntaxWithLocation,
        Self::ScalarCoercion,
        Self::InputObjectCoercion,
        Self::CatchAll,
    ];

    /// Whether this rule applies to `fault`.
    pub fn matches(self, fault: &Fault) -> bool {
        match self {
            Self::PrebuiltErrors => {
                matches!(fault, Fault::Query { errors, .. } if !errors.is_empty())
            }
            Self::SyntaxWithLocation => {
                matches!(fault, Fault::Syntax { location: Some(_), .. })
            }
            Self::ScalarCoercion => matches!(fault, Fault::ScalarCoercion { .. }),
            Self::InputObjectCoercion => matches!(fault, Fault::InputObjectCoercion { .. }),
            Self::CatchAll => true,
        }
    }

    /// Classification given to records built under this rule.
    pub fn classification(self) -> ErrorClassification {
        match self {
            Self::PrebuiltErrors | Self::SyntaxWithLocation => ErrorClassification::QueryStructure,
            Self::ScalarCoercion => ErrorClassification::ScalarCoercion,
            Self::InputObjectCoercion => ErrorClassification::InputObjectCoercion,
            Self::CatchAll => ErrorClassification::Unexpected,
        }
    }
}

/// First rule in [`FaultRule::PRIORITY`] that matches `fault`.
pub fn classify(fault: &Fault) -> FaultRule {
    FaultRule::PRIORITY
        .into_iter()
        .find(|rule| rule.matches(fault))
        .unwrap_or(FaultRule::CatchAll)
}

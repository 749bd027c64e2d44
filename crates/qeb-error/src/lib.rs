// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured error records for the query error boundary.
//!
//! Every failure surfaced to a caller is an [`ErrorRecord`]: a message, an
//! [`ErrorClassification`], optional source [`Location`]s and response path,
//! open-ended extensions, and a shared reference to the originating fault for
//! server-side diagnostics. Use [`ErrorBuilder`] to construct records
//! fluently; [`WireError`] is the serialisable shape written to responses.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod classification;
mod record;
mod wire;

pub use classification::ErrorClassification;
pub use record::{ErrorBuilder, ErrorRecord, Location, PathSegment, SharedFault};
pub use wire::{CODE_EXTENSION, WireError};

// SPDX-License-Identifier: MIT OR Apache-2.0
//! qeb-pipeline
//!
//! Request pipeline with a terminal error boundary.
//!
//! Responsibilities:
//! - run request stages in order against a per-request [`RequestContext`]
//! - classify any [`Fault`] escaping the chain through ordered [`FaultRule`]s
//! - build and finalise error records through a pluggable [`ErrorHandler`]
//! - guarantee that a [`QueryResult`] is always produced

#![deny(unsafe_code)]

/// The error boundary stage.
pub mod boundary;
/// Cancellation token carried by each request.
pub mod cancel;
/// Per-request state.
pub mod context;
/// Fault kinds and classification rules.
pub mod fault;
/// Error handler policy and filters.
pub mod handler;
/// Stage trait and sequential chain.
pub mod pipeline;
/// Request outcome.
pub mod result;
/// Tracing subscriber setup.
pub mod telemetry;

pub use boundary::NormalizationStage;
pub use cancel::{CancellationReason, CancellationToken};
pub use context::RequestContext;
pub use fault::{Fault, FaultRule, classify};
pub use handler::{
    DefaultErrorHandler, ErrorFilter, ErrorHandler, FAULT_CHAIN_EXTENSION, FAULT_EXTENSION,
    LoggingErrorFilter, MaskingErrorFilter,
};
pub use pipeline::{Pipeline, RequestStage};
pub use result::QueryResult;

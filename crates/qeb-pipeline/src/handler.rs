// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error handler policy: how unexpected faults become records, and how every
//! record is finalised before it reaches the caller.

use crate::fault::Fault;
use qeb_config::{BoundaryConfig, ErrorHandlerConfig};
use qeb_error::{CODE_EXTENSION, ErrorBuilder, ErrorClassification, ErrorRecord, SharedFault};
use std::sync::Arc;
use tracing::{debug, error};

/// Extension key holding the fault's display text when details are enabled.
pub const FAULT_EXTENSION: &str = "fault";

/// Extension key holding the fault's source chain when details are enabled.
pub const FAULT_CHAIN_EXTENSION: &str = "faultChain";

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Policy consulted by the [`NormalizationStage`](crate::NormalizationStage).
///
/// Both operations run inline on the request's control path, so they must
/// be total and must not block. Push slow side effects (remote logging,
/// alerting) onto a background task.
pub trait ErrorHandler: Send + Sync {
    /// Builder seeded with a safe message and `fault` as the underlying
    /// fault. Callers may override the message or add locations.
    fn create_unexpected_error(&self, fault: Arc<Fault>) -> ErrorBuilder;

    /// Finalise one record.
    fn handle(&self, record: ErrorRecord) -> ErrorRecord;

    /// Finalise a batch, preserving order.
    ///
    /// The default calls [`handle`](Self::handle) once per record.
    fn handle_all(&self, records: Vec<ErrorRecord>) -> Vec<ErrorRecord> {
        records.into_iter().map(|r| self.handle(r)).collect()
    }
}

/// A single rewrite step applied by [`DefaultErrorHandler::handle`].
pub trait ErrorFilter: Send + Sync {
    /// Return the (possibly rewritten) record.
    fn on_error(&self, record: ErrorRecord) -> ErrorRecord;
}

impl<F> ErrorFilter for F
where
    F: Fn(ErrorRecord) -> ErrorRecord + Send + Sync,
{
    fn on_error(&self, record: ErrorRecord) -> ErrorRecord {
        self(record)
    }
}

// ---------------------------------------------------------------------------
// DefaultErrorHandler
// ---------------------------------------------------------------------------

/// Handler driven by [`ErrorHandlerConfig`] plus an ordered filter list.
///
/// `handle` runs every filter in insertion order, then adds
/// `extensions.code` from the record's classification when the option is on
/// and no filter set one.
///
/// ```
/// use qeb_pipeline::{DefaultErrorHandler, LoggingErrorFilter};
///
/// let handler = DefaultErrorHandler::default().with_filter(LoggingErrorFilter);
/// assert_eq!(handler.filter_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct DefaultErrorHandler {
    options: ErrorHandlerConfig,
    filters: Vec<Arc<dyn ErrorFilter>>,
}

impl DefaultErrorHandler {
    /// Handler with the given options and no filters.
    #[must_use]
    pub fn new(options: ErrorHandlerConfig) -> Self {
        Self {
            options,
            filters: Vec::new(),
        }
    }

    /// Handler configured from the `[error_handler]` section.
    #[must_use]
    pub fn from_config(config: &BoundaryConfig) -> Self {
        Self::new(config.error_handler.clone())
    }

    /// Append a filter (builder pattern).
    #[must_use]
    pub fn with_filter(mut self, filter: impl ErrorFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &ErrorHandlerConfig {
        &self.options
    }

    /// Number of registered filters.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn create_unexpected_error(&self, fault: Arc<Fault>) -> ErrorBuilder {
        let mut builder = ErrorBuilder::new(self.options.unexpected_message());
        if self.options.include_fault_details() {
            builder = builder
                .set_extension(FAULT_EXTENSION, fault.to_string())
                .set_extension(FAULT_CHAIN_EXTENSION, source_chain(&*fault));
        }
        let shared: SharedFault = fault;
        builder.set_underlying_fault(shared)
    }

    fn handle(&self, record: ErrorRecord) -> ErrorRecord {
        let record = self
            .filters
            .iter()
            .fold(record, |acc, filter| filter.on_error(acc));

        if self.options.expose_classification_code() && record.extension(CODE_EXTENSION).is_none()
        {
            let code = record.classification().code();
            record.with_extension(CODE_EXTENSION, code)
        } else {
            record
        }
    }
}

impl std::fmt::Debug for DefaultErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultErrorHandler")
            .field("options", &self.options)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Messages of every error below `err` in its source chain.
fn source_chain(err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut next = err.source();
    while let Some(e) = next {
        chain.push(e.to_string());
        next = e.source();
    }
    chain
}

// ---------------------------------------------------------------------------
// Built-in filters
// ---------------------------------------------------------------------------

/// Logs each record as it is finalised and passes it through unchanged.
///
/// Unexpected records log at `error` with the underlying fault text, which
/// never reaches the client; client-caused records log at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorFilter;

impl ErrorFilter for LoggingErrorFilter {
    fn on_error(&self, record: ErrorRecord) -> ErrorRecord {
        let fault = record.underlying_fault().map(|f| f.to_string());
        if record.classification().is_client_error() {
            debug!(
                target: "qeb.handler",
                classification = %record.classification(),
                fault = fault.as_deref().unwrap_or(""),
                "{}",
                record.message()
            );
        } else {
            error!(
                target: "qeb.handler",
                classification = %record.classification(),
                fault = fault.as_deref().unwrap_or(""),
                "{}",
                record.message()
            );
        }
        record
    }
}

/// Replaces the message of every record with a given classification.
#[derive(Debug, Clone)]
pub struct MaskingErrorFilter {
    classification: ErrorClassification,
    message: String,
}

impl MaskingErrorFilter {
    /// Mask records classified as `classification` with `message`.
    #[must_use]
    pub fn new(classification: ErrorClassification, message: impl Into<String>) -> Self {
        Self {
            classification,
            message: message.into(),
        }
    }
}

impl ErrorFilter for MaskingErrorFilter {
    fn on_error(&self, record: ErrorRecord) -> ErrorRecord {
        if record.classification() == self.classification {
            record.with_message(self.message.clone())
        } else {
            record
        }
    }
}

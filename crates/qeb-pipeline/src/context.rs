// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-request mutable state shared by the stages of one pipeline run.

use crate::cancel::CancellationToken;
use crate::fault::Fault;
use crate::result::QueryResult;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

/// State for a single request.
///
/// A context is owned by exactly one task for its whole lifetime, so none of
/// its fields need synchronisation. `result` is set by whichever stage
/// terminates the request; `fault` is only ever set by the
/// [`NormalizationStage`](crate::NormalizationStage).
#[derive(Debug)]
pub struct RequestContext {
    id: Uuid,
    query: String,
    operation_name: Option<String>,
    variables: JsonMap<String, JsonValue>,
    cancellation: CancellationToken,
    fault: Option<Arc<Fault>>,
    result: Option<QueryResult>,
}

impl RequestContext {
    /// New context for `query` with a fresh id and no variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            operation_name: None,
            variables: JsonMap::new(),
            cancellation: CancellationToken::new(),
            fault: None,
            result: None,
        }
    }

    /// Set the operation to execute.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set the variable values.
    #[must_use]
    pub fn with_variables(mut self, variables: JsonMap<String, JsonValue>) -> Self {
        self.variables = variables;
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Request id, used to correlate log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Operation name, if the caller picked one.
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Variable values.
    pub fn variables(&self) -> &JsonMap<String, JsonValue> {
        &self.variables
    }

    /// Token observed by stages that do cancellable work.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Return [`Fault::Cancelled`] if the request has been cancelled.
    ///
    /// Stages call this between units of work:
    ///
    /// ```
    /// # use qeb_pipeline::{Fault, RequestContext};
    /// fn step(ctx: &RequestContext) -> Result<(), Fault> {
    ///     ctx.check_cancelled()?;
    ///     Ok(())
    /// }
    /// # assert!(step(&RequestContext::new("{ a }")).is_ok());
    /// ```
    pub fn check_cancelled(&self) -> Result<(), Fault> {
        if self.cancellation.is_cancelled() {
            Err(Fault::Cancelled {
                reason: self.cancellation.reason(),
            })
        } else {
            Ok(())
        }
    }

    /// Fault captured by the boundary, if the request failed.
    pub fn fault(&self) -> Option<&Arc<Fault>> {
        self.fault.as_ref()
    }

    /// Final result, once a stage has produced one.
    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    /// Install the final result.
    pub fn set_result(&mut self, result: QueryResult) {
        self.result = Some(result);
    }

    /// Take the final result out of the context.
    pub fn take_result(&mut self) -> Option<QueryResult> {
        self.result.take()
    }

    pub(crate) fn set_fault(&mut self, fault: Arc<Fault>) {
        self.fault = Some(fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationReason;
    use serde_json::json;

    #[test]
    fn new_context_is_empty() {
        let ctx = RequestContext::new("{ a }");
        assert_eq!(ctx.query(), "{ a }");
        assert!(ctx.operation_name().is_none());
        assert!(ctx.variables().is_empty());
        assert!(ctx.fault().is_none());
        assert!(ctx.result().is_none());
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(RequestContext::new("").id(), RequestContext::new("").id());
    }

    #[test]
    fn builder_setters() {
        let mut vars = JsonMap::new();
        vars.insert("id".into(), json!(7));
        let ctx = RequestContext::new("query Q($id: Int) { a(id: $id) }")
            .with_operation_name("Q")
            .with_variables(vars);
        assert_eq!(ctx.operation_name(), Some("Q"));
        assert_eq!(ctx.variables()["id"], json!(7));
    }

    #[test]
    fn check_cancelled_reports_reason() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new("{ a }").with_cancellation(token.clone());
        assert!(ctx.check_cancelled().is_ok());
        token.cancel_with(CancellationReason::ClientDisconnected);
        match ctx.check_cancelled() {
            Err(Fault::Cancelled { reason }) => {
                assert_eq!(reason, Some(CancellationReason::ClientDisconnected));
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn take_result_empties_slot() {
        let mut ctx = RequestContext::new("{ a }");
        ctx.set_result(QueryResult::data(json!({})));
        assert!(ctx.take_result().is_some());
        assert!(ctx.result().is_none());
    }
}

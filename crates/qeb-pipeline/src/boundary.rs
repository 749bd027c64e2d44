// SPDX-License-Identifier: MIT OR Apache-2.0
//! The error boundary: the stage that turns every fault escaping the chain
//! into error records on the request's result.

use crate::context::RequestContext;
use crate::fault::{Fault, FaultRule, classify};
use crate::handler::ErrorHandler;
use crate::pipeline::RequestStage;
use crate::result::QueryResult;
use async_trait::async_trait;
use futures::FutureExt;
use qeb_config::DEFAULT_UNEXPECTED_MESSAGE;
use qeb_error::{ErrorBuilder, ErrorClassification, ErrorRecord, SharedFault};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// Wraps the downstream chain and guarantees that a fault never escapes.
///
/// On success the stage is a pass-through and touches nothing. On fault it
/// classifies the fault with [`classify`], builds the records for the
/// matching [`FaultRule`], finalises them with the [`ErrorHandler`], then
/// writes the fault and an error [`QueryResult`] onto the context, once each.
///
/// Panics raised downstream are caught and treated as unrecognised faults.
pub struct NormalizationStage {
    next: Arc<dyn RequestStage>,
    handler: Arc<dyn ErrorHandler>,
}

impl NormalizationStage {
    /// Wrap `next`, finalising records with `handler`.
    pub fn new(next: Arc<dyn RequestStage>, handler: Arc<dyn ErrorHandler>) -> Self {
        Self { next, handler }
    }

    /// Name of the wrapped stage.
    pub fn next_name(&self) -> &str {
        self.next.name()
    }

    /// Run the downstream chain. When this returns, `ctx.result()` is set.
    pub async fn invoke(&self, ctx: &mut RequestContext) {
        debug!(target: "qeb.pipeline", request_id = %ctx.id(), next = %self.next.name(), "entering error boundary");

        let outcome = AssertUnwindSafe(self.next.invoke(ctx)).catch_unwind().await;
        let fault = match outcome {
            Ok(Ok(())) if ctx.result().is_some() => return,
            Ok(Ok(())) => Fault::NoResult,
            Ok(Err(fault)) => fault,
            Err(payload) => Fault::Panicked {
                message: panic_message(payload.as_ref()),
            },
        };

        self.normalize(ctx, fault);
    }

    fn normalize(&self, ctx: &mut RequestContext, fault: Fault) {
        let fault = Arc::new(fault);
        let rule = classify(&fault);

        if rule == FaultRule::CatchAll {
            error!(target: "qeb.pipeline", request_id = %ctx.id(), kind = fault.kind(), fault = %fault, "unexpected fault");
        } else {
            debug!(target: "qeb.pipeline", request_id = %ctx.id(), kind = fault.kind(), rule = ?rule, "classified fault");
        }
        if ctx.result().is_some() {
            debug!(target: "qeb.pipeline", request_id = %ctx.id(), "discarding result written before the fault");
        }

        let records = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let built = self.build_records(rule, &fault);
            self.handler.handle_all(built)
        }))
        .unwrap_or_else(|payload| {
            error!(
                target: "qeb.pipeline",
                request_id = %ctx.id(),
                panic = %panic_message(payload.as_ref()),
                "error handler panicked; using fallback record"
            );
            vec![fallback_record(&fault)]
        });

        ctx.set_fault(fault);
        ctx.set_result(QueryResult::from_errors(records));
    }

    fn build_records(&self, rule: FaultRule, fault: &Arc<Fault>) -> Vec<ErrorRecord> {
        let classification = rule.classification();
        match rule {
            // Records still tagged unexpected take the rule's classification;
            // anything a validator classified itself is kept.
            FaultRule::PrebuiltErrors => fault
                .prebuilt_errors()
                .iter()
                .map(|record| {
                    if record.classification() == ErrorClassification::Unexpected {
                        ErrorBuilder::from_record(record)
                            .set_classification(classification)
                            .build()
                    } else {
                        record.clone()
                    }
                })
                .collect(),
            FaultRule::SyntaxWithLocation => {
                let mut builder = self
                    .handler
                    .create_unexpected_error(fault.clone())
                    .set_message(fault.message())
                    .set_classification(classification);
                if let Some(location) = fault.location() {
                    builder = builder.add_location(location);
                }
                vec![builder.build()]
            }
            FaultRule::ScalarCoercion | FaultRule::InputObjectCoercion => vec![
                self.handler
                    .create_unexpected_error(fault.clone())
                    .set_message(fault.message())
                    .set_classification(classification)
                    .build(),
            ],
            FaultRule::CatchAll => vec![
                self.handler
                    .create_unexpected_error(fault.clone())
                    .set_classification(classification)
                    .build(),
            ],
        }
    }
}

#[async_trait]
impl RequestStage for NormalizationStage {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        NormalizationStage::invoke(self, ctx).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "error_boundary"
    }
}

impl std::fmt::Debug for NormalizationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizationStage")
            .field("next", &self.next.name())
            .finish_non_exhaustive()
    }
}

fn fallback_record(fault: &Arc<Fault>) -> ErrorRecord {
    let shared: SharedFault = fault.clone();
    ErrorBuilder::new(DEFAULT_UNEXPECTED_MESSAGE)
        .set_classification(ErrorClassification::Unexpected)
        .set_underlying_fault(shared)
        .build()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end tests of the error boundary wrapped around a stage chain.

use async_trait::async_trait;
use qeb_error::{ErrorBuilder, ErrorClassification, ErrorRecord, Location};
use qeb_pipeline::{
    CancellationReason, CancellationToken, DefaultErrorHandler, ErrorHandler, Fault,
    MaskingErrorFilter, NormalizationStage, Pipeline, QueryResult, RequestContext, RequestStage,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Produces a result without faulting.
struct Respond(serde_json::Value);

#[async_trait]
impl RequestStage for Respond {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        ctx.set_result(QueryResult::data(self.0.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        "respond"
    }
}

/// Raises the fault built by the closure.
struct Raise<F>(F);

#[async_trait]
impl<F> RequestStage for Raise<F>
where
    F: Fn() -> Fault + Send + Sync,
{
    async fn invoke(&self, _ctx: &mut RequestContext) -> Result<(), Fault> {
        Err((self.0)())
    }

    fn name(&self) -> &str {
        "raise"
    }
}

/// Writes a partial result, then faults.
struct WriteThenFail;

#[async_trait]
impl RequestStage for WriteThenFail {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        ctx.set_result(QueryResult::data(json!({"partial": true})));
        Err(Fault::scalar("Int cannot represent 1.5"))
    }

    fn name(&self) -> &str {
        "write_then_fail"
    }
}

/// Waits for cancellation, then reports it.
struct AwaitCancel;

#[async_trait]
impl RequestStage for AwaitCancel {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        ctx.cancellation().cancelled().await;
        ctx.check_cancelled()
    }

    fn name(&self) -> &str {
        "await_cancel"
    }
}

// ---------------------------------------------------------------------------
// Recording handler
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingHandler {
    inner: DefaultErrorHandler,
    created: AtomicUsize,
    handled: Mutex<Vec<String>>,
}

impl ErrorHandler for RecordingHandler {
    fn create_unexpected_error(&self, fault: Arc<Fault>) -> ErrorBuilder {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.inner.create_unexpected_error(fault)
    }

    fn handle(&self, record: ErrorRecord) -> ErrorRecord {
        self.handled.lock().unwrap().push(record.message().to_string());
        self.inner.handle(record)
    }
}

fn boundary(next: impl RequestStage + 'static) -> NormalizationStage {
    Pipeline::new()
        .stage(next)
        .into_boundary(DefaultErrorHandler::default())
}

async fn run(stage: &NormalizationStage) -> RequestContext {
    let mut ctx = RequestContext::new("{ user { name } }");
    stage.invoke(&mut ctx).await;
    ctx
}

// ---------------------------------------------------------------------------
// Pass-through and totality
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_leaves_result_untouched() {
    let stage = boundary(Respond(json!({"user": {"name": "ada"}})));
    let ctx = run(&stage).await;
    assert!(ctx.fault().is_none());
    assert_eq!(
        serde_json::to_value(ctx.result().unwrap()).unwrap(),
        json!({"data": {"user": {"name": "ada"}}})
    );
}

#[tokio::test]
async fn every_fault_kind_yields_a_result() {
    let faults: Vec<fn() -> Fault> = vec![
        || Fault::query("bad", vec![ErrorBuilder::new("a").build()]),
        || Fault::query("bad", vec![]),
        || Fault::syntax("unexpected token", 1, 1),
        || Fault::Syntax {
            message: "eof".into(),
            location: None,
        },
        || Fault::scalar("bad scalar"),
        || Fault::input_object("bad input"),
        || Fault::Cancelled { reason: None },
        || Fault::Panicked {
            message: "boom".into(),
        },
        || Fault::NoResult,
        || Fault::other(anyhow::anyhow!("disk full")),
    ];
    for make in faults {
        let stage = boundary(Raise(make));
        let ctx = run(&stage).await;
        let result = ctx.result().expect("boundary must always set a result");
        assert!(!result.errors().is_empty(), "{:?}", make());
        assert!(ctx.fault().is_some());
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn syntax_fault_keeps_message_and_location() {
    let stage = boundary(Raise(|| Fault::syntax("unexpected token", 3, 5)));
    let ctx = run(&stage).await;
    let errors = ctx.result().unwrap().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message(), "unexpected token");
    assert_eq!(errors[0].locations(), &[Location::new(3, 5)]);
    assert_eq!(errors[0].classification(), ErrorClassification::QueryStructure);
}

#[tokio::test]
async fn prebuilt_records_are_handled_once_each_in_order() {
    let handler = Arc::new(RecordingHandler::default());
    let first = ErrorBuilder::new("Unknown field 'x'")
        .set_classification(ErrorClassification::QueryStructure)
        .add_location(Location::new(1, 3))
        .build();
    let second = ErrorBuilder::new("Unknown field 'y'")
        .set_classification(ErrorClassification::QueryStructure)
        .add_location(Location::new(2, 3))
        .build();
    let errors = vec![first, second];
    let stage = NormalizationStage::new(
        Arc::new(Raise(move || Fault::query("validation failed", errors.clone()))),
        handler.clone(),
    );

    let ctx = run(&stage).await;
    let messages: Vec<_> = ctx
        .result()
        .unwrap()
        .errors()
        .iter()
        .map(|e| e.message().to_string())
        .collect();
    assert_eq!(messages, ["Unknown field 'x'", "Unknown field 'y'"]);
    assert_eq!(
        *handler.handled.lock().unwrap(),
        ["Unknown field 'x'", "Unknown field 'y'"]
    );
    assert_eq!(handler.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn validator_records_without_classification_are_query_structure() {
    let stage = boundary(Raise(|| {
        Fault::query(
            "validation failed",
            vec![
                ErrorBuilder::new("Unknown field 'x'")
                    .add_location(Location::new(1, 3))
                    .build(),
            ],
        )
    }));
    let ctx = run(&stage).await;
    let result = ctx.result().unwrap();
    assert_eq!(
        result.errors()[0].classification(),
        ErrorClassification::QueryStructure
    );
    assert_eq!(
        serde_json::to_value(result).unwrap(),
        json!({"errors": [{
            "message": "Unknown field 'x'",
            "locations": [{"line": 1, "column": 3}],
            "extensions": {"code": "QUERY_STRUCTURE"}
        }]})
    );
}

#[tokio::test]
async fn unexpected_fault_is_suppressed_but_kept_server_side() {
    let stage = boundary(Raise(|| {
        Fault::other(std::io::Error::other("disk full"))
    }));
    let ctx = run(&stage).await;
    let result = ctx.result().unwrap();
    let record = &result.errors()[0];

    assert_eq!(record.message(), "Unexpected Execution Error");
    assert_eq!(record.classification(), ErrorClassification::Unexpected);
    assert!(!serde_json::to_string(result).unwrap().contains("disk full"));

    let captured = ctx.fault().unwrap();
    let underlying = record.underlying_fault().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(captured), Arc::as_ptr(underlying)));
    assert_eq!(underlying.to_string(), "disk full");
}

#[tokio::test]
async fn handler_is_consulted_once_for_single_record_faults() {
    let handler = Arc::new(RecordingHandler::default());
    let stage = NormalizationStage::new(
        Arc::new(Raise(|| Fault::input_object("missing field 'id'"))),
        handler.clone(),
    );
    let ctx = run(&stage).await;
    assert_eq!(handler.created.load(Ordering::SeqCst), 1);
    assert_eq!(*handler.handled.lock().unwrap(), ["missing field 'id'"]);
    assert_eq!(
        ctx.result().unwrap().errors()[0].classification(),
        ErrorClassification::InputObjectCoercion
    );
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn result_written_before_fault_is_replaced() {
    let stage = boundary(WriteThenFail);
    let ctx = run(&stage).await;
    let result = ctx.result().unwrap();
    assert!(result.data_value().is_none());
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].message(), "Int cannot represent 1.5");
}

#[tokio::test]
async fn masking_filter_applies_through_boundary() {
    let handler = DefaultErrorHandler::default().with_filter(MaskingErrorFilter::new(
        ErrorClassification::ScalarCoercion,
        "Invalid value",
    ));
    let stage = Pipeline::new()
        .stage(Raise(|| Fault::scalar("Int cannot represent 1.5")))
        .into_boundary(handler);
    let ctx = run(&stage).await;
    let value = serde_json::to_value(ctx.result().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({"errors": [{
            "message": "Invalid value",
            "extensions": {"code": "SCALAR_COERCION"}
        }]})
    );
}

// ---------------------------------------------------------------------------
// Cancellation and concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_during_stage_becomes_unexpected_error() {
    let token = CancellationToken::new();
    let stage = boundary(AwaitCancel);
    let mut ctx = RequestContext::new("{ a }").with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel_with(CancellationReason::ClientDisconnected);
    });
    stage.invoke(&mut ctx).await;
    canceller.await.unwrap();

    assert!(matches!(
        ctx.fault().map(|f| &**f),
        Some(Fault::Cancelled {
            reason: Some(CancellationReason::ClientDisconnected)
        })
    ));
    assert_eq!(
        ctx.result().unwrap().errors()[0].classification(),
        ErrorClassification::Unexpected
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_do_not_interfere() {
    let stage = Arc::new(boundary(Raise(|| Fault::scalar("bad"))));
    let mut tasks = Vec::new();
    for i in 0..64 {
        let stage = stage.clone();
        tasks.push(tokio::spawn(async move {
            let mut ctx = RequestContext::new(format!("{{ f{i} }}"));
            stage.invoke(&mut ctx).await;
            (ctx.query().to_string(), ctx.take_result())
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let (query, result) = task.await.unwrap();
        assert_eq!(query, format!("{{ f{i} }}"));
        let result = result.unwrap();
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].message(), "bad");
    }
}

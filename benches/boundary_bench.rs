// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmarks for fault classification and the error boundary's hot paths:
//! pass-through on success and normalisation of each fault kind.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use async_trait::async_trait;
use qeb_error::{ErrorBuilder, ErrorClassification, Location};
use qeb_pipeline::{
    DefaultErrorHandler, ErrorHandler, Fault, NormalizationStage, Pipeline, QueryResult,
    RequestContext, RequestStage, classify,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn prebuilt(n: usize) -> Fault {
    Fault::query(
        "validation failed",
        (0..n)
            .map(|i| {
                ErrorBuilder::new(format!("Unknown field 'f{i}'"))
                    .set_classification(ErrorClassification::QueryStructure)
                    .add_location(Location::new(1, i as u32 + 1))
                    .build()
            })
            .collect(),
    )
}

fn faults() -> Vec<(&'static str, fn() -> Fault)> {
    vec![
        ("prebuilt", || prebuilt(1)),
        ("syntax", || Fault::syntax("unexpected token", 3, 5)),
        ("scalar", || Fault::scalar("Int cannot represent 1.5")),
        ("input_object", || Fault::input_object("missing field 'id'")),
        ("other", || Fault::other(anyhow::anyhow!("disk full"))),
    ]
}

struct Raise(fn() -> Fault);

#[async_trait]
impl RequestStage for Raise {
    async fn invoke(&self, _ctx: &mut RequestContext) -> Result<(), Fault> {
        Err((self.0)())
    }

    fn name(&self) -> &str {
        "raise"
    }
}

struct Respond;

#[async_trait]
impl RequestStage for Respond {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        ctx.set_result(QueryResult::data(serde_json::json!({"a": 1})));
        Ok(())
    }

    fn name(&self) -> &str {
        "respond"
    }
}

fn boundary(stage: impl RequestStage + 'static) -> NormalizationStage {
    Pipeline::new()
        .stage(stage)
        .into_boundary(DefaultErrorHandler::default())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

// ── Benchmarks ──────────────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    for (name, make) in faults() {
        let fault = make();
        group.bench_with_input(BenchmarkId::from_parameter(name), &fault, |b, f| {
            b.iter(|| classify(black_box(f)));
        });
    }
    group.finish();
}

fn bench_boundary(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("boundary");

    let ok = boundary(Respond);
    group.bench_function("pass_through", |b| {
        b.iter(|| {
            let mut ctx = RequestContext::new("{ a }");
            rt.block_on(ok.invoke(&mut ctx));
            black_box(ctx.take_result())
        });
    });

    for (name, make) in faults() {
        let stage = boundary(Raise(make));
        group.bench_function(BenchmarkId::new("normalize", name), |b| {
            b.iter(|| {
                let mut ctx = RequestContext::new("{ a }");
                rt.block_on(stage.invoke(&mut ctx));
                black_box(ctx.take_result())
            });
        });
    }
    group.finish();
}

fn bench_handle_all(c: &mut Criterion) {
    let handler = DefaultErrorHandler::default();
    let mut group = c.benchmark_group("handle_all");
    for n in [1usize, 10, 100] {
        let records = prebuilt(n).prebuilt_errors().to_vec();
        group.bench_with_input(BenchmarkId::from_parameter(n), &records, |b, r| {
            b.iter(|| handler.handle_all(black_box(r.clone())));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_boundary, bench_handle_all);
criterion_main!(benches);

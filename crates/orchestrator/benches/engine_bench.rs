use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use common::SagaId;
use instance_store::{InMemoryInstanceStore, SagaType};
use orchestrator::{
    CompletionBridge, CompletionResult, EngineConfig, Orchestrator, RetryPolicy, SagaDefinition,
    StepDescriptor, StepOutcome,
};

fn bench_backoff_delay(c: &mut Criterion) {
    let policy = RetryPolicy::standard();

    c.bench_function("engine/backoff_delay", |b| {
        b.iter(|| {
            for attempt in 1..=32u32 {
                std::hint::black_box(policy.delay(attempt));
            }
        });
    });
}

fn bench_bridge_issue_resolve(c: &mut Criterion) {
    let bridge = CompletionBridge::new();

    c.bench_function("engine/bridge_issue_resolve", |b| {
        b.iter(|| {
            let token = bridge.issue();
            bridge.resolve(token, CompletionResult::success());
        });
    });
}

fn bench_bridge_resolve_parked_waiter(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bridge = CompletionBridge::new();

    c.bench_function("engine/bridge_resolve_parked_waiter", |b| {
        b.iter(|| {
            rt.block_on(async {
                let token = bridge.issue();
                let waiter = {
                    let bridge = bridge.clone();
                    tokio::spawn(async move { bridge.wait(token, Duration::from_secs(5)).await })
                };
                tokio::task::yield_now().await;
                bridge.resolve(token, CompletionResult::success());
                waiter.await.unwrap().unwrap();
            });
        });
    });
}

fn noop_definition(steps: usize) -> Arc<SagaDefinition<()>> {
    let mut builder = SagaDefinition::builder(SagaType::Domestic);
    for name in ["a", "b", "c", "d", "e", "f", "g", "h"].into_iter().take(steps) {
        builder = builder.step(StepDescriptor::new(name, |_ctx, _act| async {
            Ok(StepOutcome::Done)
        }));
    }
    Arc::new(builder.build())
}

fn bench_sequential_saga(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let definition = noop_definition(5);

    let mut counter = 0u64;
    c.bench_function("engine/sequential_saga_5_steps", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = Arc::new(InMemoryInstanceStore::new());
                let orchestrator = Orchestrator::new(store, EngineConfig::default());
                counter += 1;
                let handle = orchestrator
                    .start(
                        Arc::clone(&definition),
                        SagaId::new(format!("BENCH-{counter}")),
                        (),
                    )
                    .await
                    .unwrap();
                handle.finished().await;
            });
        });
    });
}

criterion_group!(
    benches,
    bench_backoff_delay,
    bench_bridge_issue_resolve,
    bench_bridge_resolve_parked_waiter,
    bench_sequential_saga
);
criterion_main!(benches);

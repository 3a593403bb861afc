use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use notifications::{
    Dispatcher, EventEnvelope, EventHandler, EventKind, ExecutionMode, HandlerRegistry,
    ProductSnapshot, Result,
};

struct Noop {
    priority: i32,
    mode: ExecutionMode,
}

#[async_trait]
impl EventHandler for Noop {
    fn name(&self) -> &str {
        "noop"
    }

    fn is_interested_in(&self, _kind: EventKind) -> bool {
        true
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn mode(&self) -> ExecutionMode {
        self.mode
    }

    async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
        Ok(())
    }
}

fn make_envelope() -> EventEnvelope {
    EventEnvelope::builder()
        .kind(EventKind::StockChanged)
        .subject(ProductSnapshot {
            id: ProductId::new(),
            sku: "SKU-001".to_string(),
            name: "Widget".to_string(),
            category: None,
            price: Money::from_cents(1000),
            stock: 10,
        })
        .try_build()
        .unwrap()
}

fn bench_inline_dispatch_10_handlers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = Dispatcher::new();
    for priority in 0..10 {
        dispatcher.register(Arc::new(Noop {
            priority,
            mode: ExecutionMode::Inline,
        }));
    }

    c.bench_function("notifications/inline_dispatch_10_handlers", |b| {
        b.iter(|| {
            rt.block_on(dispatcher.notify(make_envelope()));
        });
    });
}

fn bench_mixed_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = Dispatcher::new();
    for priority in 0..8 {
        let mode = if priority % 2 == 0 {
            ExecutionMode::Inline
        } else {
            ExecutionMode::Deferred
        };
        dispatcher.register(Arc::new(Noop { priority, mode }));
    }

    c.bench_function("notifications/mixed_dispatch_4_inline_4_deferred", |b| {
        b.iter(|| {
            rt.block_on(async {
                dispatcher.notify(make_envelope()).await;
                dispatcher.drain().await;
            });
        });
    });
}

fn bench_registry_snapshot_100_handlers(c: &mut Criterion) {
    let registry = HandlerRegistry::new();
    for priority in 0..100 {
        registry.register(Arc::new(Noop {
            priority: priority % 13,
            mode: ExecutionMode::Inline,
        }));
    }

    c.bench_function("notifications/registry_snapshot_100_handlers", |b| {
        b.iter(|| registry.snapshot());
    });
}

criterion_group!(
    benches,
    bench_inline_dispatch_10_handlers,
    bench_mixed_dispatch,
    bench_registry_snapshot_100_handlers
);
criterion_main!(benches);

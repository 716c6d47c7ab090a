use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use stockroom_core::{TenantId, UserId};
use stockroom_events::{EventEnvelope, InMemoryEventBus};
use stockroom_infra::config::LedgerConfig;
use stockroom_infra::event_store::InMemoryEventStore;
use stockroom_infra::stock_ledger::{EntryRequest, ExitRequest, NewEmployee, NewProduct, StockLedger};
use stockroom_ledger::{EmployeeId, ExitKind, MovementFilter, ProductCategory, ProductId};

type Ledger = StockLedger<InMemoryEventStore, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

fn effective_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

/// A ledger holding one product with `history` movements already recorded.
fn setup(opening: i64, history: usize) -> (Ledger, TenantId, ProductId, EmployeeId) {
    let ledger = StockLedger::new(
        InMemoryEventStore::new(),
        Arc::new(InMemoryEventBus::new()),
        LedgerConfig::default(),
    );
    let tenant_id = TenantId::new();
    let actor = UserId::new();
    let product_id = ledger
        .register_product(
            tenant_id,
            actor,
            NewProduct {
                code: "CAM-M".to_string(),
                name: "Camisa M".to_string(),
                category: ProductCategory::Uniform,
                unit: "un".to_string(),
                minimum_stock: 5,
                opening_stock: Some(opening),
                opening_date: Some(effective_date()),
            },
        )
        .unwrap()
        .product_id;
    let employee_id = ledger
        .register_employee(
            tenant_id,
            NewEmployee {
                name: "Ana".to_string(),
                email: None,
                area: "Warehouse".to_string(),
                position: "Operator".to_string(),
            },
        )
        .unwrap()
        .employee_id;

    for _ in 0..history {
        ledger
            .record_entry(tenant_id, actor, entry(product_id, 1))
            .unwrap();
    }
    (ledger, tenant_id, product_id, employee_id)
}

fn entry(product_id: ProductId, quantity: i64) -> EntryRequest {
    EntryRequest {
        product_id,
        quantity,
        supplier: "Textil SA".to_string(),
        effective_date: effective_date(),
        notes: None,
    }
}

fn delivery(product_id: ProductId, employee_id: EmployeeId) -> ExitRequest {
    ExitRequest {
        product_id,
        employee_id,
        quantity: 1,
        kind: ExitKind::Delivered,
        effective_date: effective_date(),
        signature: Some("Ana".to_string()),
        notes: None,
    }
}

fn bench_record_exit_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_exit_latency");

    // Every exit replays the product stream, so latency grows with history.
    for history in [0usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("history", history), &history, |b, &history| {
            let (ledger, tenant_id, product_id, employee_id) = setup(i64::MAX / 2, history);
            let actor = UserId::new();
            b.iter(|| {
                ledger
                    .record_exit(tenant_id, actor, black_box(delivery(product_id, employee_id)))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_contended_exits(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_exits");
    group.sample_size(20);

    for threads in [2usize, 8] {
        let per_thread = 50;
        group.throughput(Throughput::Elements((threads * per_thread) as u64));
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                let (ledger, tenant_id, product_id, employee_id) = setup((threads * per_thread) as i64, 0);
                std::thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            let actor = UserId::new();
                            for _ in 0..per_thread {
                                ledger
                                    .record_exit(tenant_id, actor, delivery(product_id, employee_id))
                                    .unwrap();
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_read_model_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_model_rebuild");

    for history in [100usize, 1000] {
        group.throughput(Throughput::Elements(history as u64));
        group.bench_with_input(BenchmarkId::new("movements", history), &history, |b, &history| {
            let (ledger, _, _, _) = setup(0, history);
            b.iter(|| black_box(ledger.rebuild_read_models().unwrap()));
        });
    }

    group.finish();
}

fn bench_list_movements(c: &mut Criterion) {
    let (ledger, tenant_id, product_id, _) = setup(0, 1000);
    let filter = MovementFilter {
        product_id: Some(product_id),
        search: Some("ent-".to_string()),
        ..MovementFilter::default()
    };

    c.bench_function("list_movements_1000", |b| {
        b.iter(|| black_box(ledger.list_movements(tenant_id, &filter).unwrap().len()));
    });
}

criterion_group!(
    benches,
    bench_record_exit_latency,
    bench_contended_exits,
    bench_read_model_rebuild,
    bench_list_movements
);
criterion_main!(benches);

//! Integration tests for the ledger pipeline.
//!
//! Tests: request → StockLedger → EventStore → EventBus / read models
//!
//! Verifies:
//! - Stock never goes negative under concurrent exits
//! - Business rejections leave nothing behind
//! - Optimistic conflicts are retried, then surfaced
//! - Listings, reports and the dashboard agree with the committed stream

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use chrono::NaiveDate;
    use serde_json::Value as JsonValue;

    use stockroom_core::{ExpectedVersion, TenantId, UserId};
    use stockroom_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use stockroom_ledger::{
        ExitKind, LedgerError, MovementFilter, MovementKind, ProductCategory, ProductId, StockStatus,
    };

    use crate::config::LedgerConfig;
    use crate::event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
    use crate::projections::ProductQuery;
    use crate::stock_ledger::{EntryRequest, ExitRequest, NewEmployee, NewProduct, StockLedger};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn fast_config(max_conflict_retries: u32) -> LedgerConfig {
        LedgerConfig {
            max_conflict_retries,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(4),
            ..LedgerConfig::default()
        }
    }

    fn ledger() -> StockLedger<InMemoryEventStore, Bus> {
        StockLedger::new(InMemoryEventStore::new(), Arc::new(InMemoryEventBus::new()), LedgerConfig::default())
    }

    fn product<S: EventStore, B: EventBus<EventEnvelope<JsonValue>>>(
        ledger: &StockLedger<S, B>,
        tenant: TenantId,
        code: &str,
        opening: i64,
        minimum: i64,
    ) -> ProductId {
        ledger
            .register_product(
                tenant,
                UserId::new(),
                NewProduct {
                    code: code.to_string(),
                    name: format!("Product {code}"),
                    category: ProductCategory::Uniform,
                    unit: "un".to_string(),
                    minimum_stock: minimum,
                    opening_stock: Some(opening),
                    opening_date: Some(day(2, 1)),
                },
            )
            .unwrap()
            .product_id
    }

    fn employee<S: EventStore, B: EventBus<EventEnvelope<JsonValue>>>(
        ledger: &StockLedger<S, B>,
        tenant: TenantId,
        name: &str,
    ) -> stockroom_ledger::EmployeeId {
        ledger
            .register_employee(
                tenant,
                NewEmployee {
                    name: name.to_string(),
                    email: None,
                    area: "Warehouse".to_string(),
                    position: "Operator".to_string(),
                },
            )
            .unwrap()
            .employee_id
    }

    fn deliver(product_id: ProductId, employee_id: stockroom_ledger::EmployeeId, quantity: i64) -> ExitRequest {
        ExitRequest {
            product_id,
            employee_id,
            quantity,
            kind: ExitKind::Delivered,
            effective_date: day(3, 10),
            signature: Some("J. Silva".to_string()),
            notes: None,
        }
    }

    fn give_back(product_id: ProductId, employee_id: stockroom_ledger::EmployeeId, quantity: i64) -> ExitRequest {
        ExitRequest {
            kind: ExitKind::Returned,
            signature: None,
            ..deliver(product_id, employee_id, quantity)
        }
    }

    fn entry(product_id: ProductId, quantity: i64, effective_date: NaiveDate) -> EntryRequest {
        EntryRequest {
            product_id,
            quantity,
            supplier: "Textil SA".to_string(),
            effective_date,
            notes: None,
        }
    }

    #[test]
    fn camisa_m_lifecycle() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let actor = UserId::new();
        let shirt = product(&ledger, tenant, "cam-m", 20, 5);
        let ana = employee(&ledger, tenant, "Ana");

        let delivered = ledger.record_exit(tenant, actor, deliver(shirt, ana, 3)).unwrap();
        assert_eq!(delivered.kind, MovementKind::Delivered);
        assert!(delivered.number.as_str().starts_with("DEL-20240310-"));
        assert_eq!(ledger.get_stock_status(tenant, shirt).unwrap().level, 17);

        let unsigned = ExitRequest {
            signature: Some("   ".to_string()),
            ..deliver(shirt, ana, 1)
        };
        assert_eq!(ledger.record_exit(tenant, actor, unsigned), Err(LedgerError::MissingSignature));

        assert_eq!(
            ledger.record_exit(tenant, actor, deliver(shirt, ana, 30)),
            Err(LedgerError::InsufficientStock {
                requested: 30,
                available: 17
            })
        );

        ledger.record_exit(tenant, actor, give_back(shirt, ana, 1)).unwrap();
        assert_eq!(
            ledger.record_exit(tenant, actor, give_back(shirt, ana, 5)),
            Err(LedgerError::ReturnExceedsDelivered {
                requested: 5,
                outstanding: 2
            })
        );

        let status = ledger.get_stock_status(tenant, shirt).unwrap();
        assert_eq!(status.level, 18);
        assert_eq!(status.status, StockStatus::Normal);
        assert_eq!(status.code, "CAM-M");

        // Opening entry, one delivery and one return; rejections left nothing behind.
        let movements = ledger.list_movements(tenant, &MovementFilter::default()).unwrap();
        assert_eq!(movements.len(), 3);
        assert_eq!(ledger.get_product(tenant, shirt).unwrap().current_stock, 18);
    }

    fn race(exits: usize, stock: i64) -> (usize, i64) {
        let ledger = Arc::new(ledger());
        let tenant = TenantId::new();
        let item = product(&ledger, tenant, "BOTA-42", stock, 0);
        let worker = employee(&ledger, tenant, "Bruno");

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..exits)
                .map(|_| {
                    let ledger = ledger.clone();
                    s.spawn(move || ledger.record_exit(tenant, UserId::new(), deliver(item, worker, 1)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for r in &results {
            if let Err(err) = r {
                assert!(matches!(err, LedgerError::InsufficientStock { .. }), "unexpected {err:?}");
            }
        }
        let ok = results.iter().filter(|r| r.is_ok()).count();
        (ok, ledger.get_stock_status(tenant, item).unwrap().level)
    }

    #[test]
    fn concurrent_exits_never_oversell() {
        assert_eq!(race(12, 7), (7, 0));
        assert_eq!(race(4, 10), (4, 6));
    }

    #[test]
    fn replicas_sharing_a_store_never_oversell() {
        let store = Arc::new(InMemoryEventStore::new());
        let a = Arc::new(StockLedger::new(store.clone(), InMemoryEventBus::new(), fast_config(50)));
        let b = Arc::new(StockLedger::new(store.clone(), InMemoryEventBus::new(), fast_config(50)));
        let tenant = TenantId::new();
        let item = product(&*a, tenant, "LUVA-G", 6, 0);
        let worker = employee(&*a, tenant, "Carla");

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..10)
                .map(|i| {
                    let ledger = if i % 2 == 0 { a.clone() } else { b.clone() };
                    s.spawn(move || ledger.record_exit(tenant, UserId::new(), deliver(item, worker, 1)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 6);
        assert!(
            results
                .iter()
                .all(|r| r.is_ok() || matches!(r, Err(LedgerError::InsufficientStock { .. })))
        );
        assert_eq!(a.get_stock_status(tenant, item).unwrap().level, 0);
        assert_eq!(b.get_stock_status(tenant, item).unwrap().level, 0);

        for replica in [&a, &b] {
            replica.sync_read_models().unwrap();
            assert_eq!(replica.list_movements(tenant, &MovementFilter::default()).unwrap().len(), 7);
            assert_eq!(replica.get_product(tenant, item).unwrap().current_stock, 0);
        }
    }

    #[test]
    fn replicas_converge_on_each_others_commits() {
        let store = Arc::new(InMemoryEventStore::new());
        let a = StockLedger::new(store.clone(), InMemoryEventBus::new(), LedgerConfig::default());
        let b = StockLedger::new(store.clone(), InMemoryEventBus::new(), LedgerConfig::default());
        let tenant = TenantId::new();
        let actor = UserId::new();
        let shirt = product(&a, tenant, "CAM-M", 10, 2);
        let ana = employee(&a, tenant, "Ana");

        // B has never seen Ana, but the employee stream is committed.
        b.record_exit(tenant, actor, deliver(shirt, ana, 3)).unwrap();
        assert_eq!(b.get_employee(tenant, ana).unwrap().name, "Ana");
        assert_eq!(b.list_movements(tenant, &MovementFilter::default()).unwrap().len(), 2);

        a.record_entry(tenant, actor, entry(shirt, 4, day(3, 12))).unwrap();
        assert_eq!(b.list_movements(tenant, &MovementFilter::default()).unwrap().len(), 2);
        assert_eq!(b.sync_read_models().unwrap(), 1);
        assert_eq!(b.list_movements(tenant, &MovementFilter::default()).unwrap().len(), 3);
        assert_eq!(b.get_product(tenant, shirt).unwrap().current_stock, 11);
        assert_eq!(b.sync_read_models().unwrap(), 0);

        // A deactivation on A is honoured by B without any sync.
        a.set_employee_active(tenant, ana, false).unwrap();
        assert_eq!(
            b.record_exit(tenant, actor, deliver(shirt, ana, 1)).unwrap_err(),
            LedgerError::UnknownEmployee
        );
        assert_eq!(b.get_stock_status(tenant, shirt).unwrap().level, 11);
    }

    #[test]
    fn product_ids_are_not_employees() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let shirt = product(&ledger, tenant, "CAM-M", 10, 2);
        let not_an_employee = stockroom_ledger::EmployeeId::new(shirt.0);
        assert_eq!(
            ledger.record_exit(tenant, UserId::new(), deliver(shirt, not_an_employee, 1)).unwrap_err(),
            LedgerError::UnknownEmployee
        );
    }

    #[test]
    fn overflowing_entries_leave_the_product_usable() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let actor = UserId::new();
        let shirt = product(&ledger, tenant, "CAM-M", 10, 2);
        let ana = employee(&ledger, tenant, "Ana");

        assert_eq!(
            ledger.record_entry(tenant, actor, entry(shirt, i64::MAX, day(3, 1))).unwrap_err(),
            LedgerError::InvalidQuantity(i64::MAX)
        );
        assert_eq!(ledger.get_stock_status(tenant, shirt).unwrap().level, 10);

        ledger.record_exit(tenant, actor, deliver(shirt, ana, 4)).unwrap();
        ledger.record_entry(tenant, actor, entry(shirt, 1, day(3, 11))).unwrap();
        assert_eq!(ledger.get_stock_status(tenant, shirt).unwrap().level, 7);
        assert_eq!(ledger.list_movements(tenant, &MovementFilter::default()).unwrap().len(), 3);
    }

    /// Store that reports a conflict on the next `n` appends.
    #[derive(Debug, Default)]
    struct ContendedStore {
        inner: InMemoryEventStore,
        conflicts: AtomicU32,
        appends: AtomicU32,
    }

    impl ContendedStore {
        fn conflict_next(&self, n: u32) {
            self.conflicts.store(n, Ordering::SeqCst);
        }
    }

    impl EventStore for ContendedStore {
        fn append(
            &self,
            events: Vec<UncommittedEvent>,
            expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            let pending = self.conflicts.load(Ordering::SeqCst);
            if pending > 0 {
                self.conflicts.store(pending - 1, Ordering::SeqCst);
                return Err(EventStoreError::Concurrency("injected".to_string()));
            }
            self.inner.append(events, expected_version)
        }

        fn load_stream(
            &self,
            tenant_id: TenantId,
            aggregate_id: stockroom_core::AggregateId,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_stream(tenant_id, aggregate_id)
        }

        fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_all()
        }
    }

    #[test]
    fn conflicts_are_retried_within_the_budget() {
        let store = Arc::new(ContendedStore::default());
        let ledger = StockLedger::new(store.clone(), InMemoryEventBus::new(), fast_config(3));
        let tenant = TenantId::new();
        let item = product(&ledger, tenant, "MED-01", 0, 0);

        store.conflict_next(2);
        let before = store.appends.load(Ordering::SeqCst);
        ledger.record_entry(tenant, UserId::new(), entry(item, 4, day(3, 1))).unwrap();
        assert_eq!(store.appends.load(Ordering::SeqCst) - before, 3);
        assert_eq!(ledger.get_stock_status(tenant, item).unwrap().level, 4);
        assert_eq!(ledger.list_movements(tenant, &MovementFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn persistent_conflicts_surface_after_the_budget() {
        let store = Arc::new(ContendedStore::default());
        let ledger = StockLedger::new(store.clone(), InMemoryEventBus::new(), fast_config(3));
        let tenant = TenantId::new();
        let item = product(&ledger, tenant, "MED-02", 5, 0);

        store.conflict_next(10);
        assert_eq!(
            ledger.record_entry(tenant, UserId::new(), entry(item, 4, day(3, 1))),
            Err(LedgerError::ConcurrentUpdateConflict { attempts: 3 })
        );
        store.conflict_next(0);
        assert_eq!(ledger.get_stock_status(tenant, item).unwrap().level, 5);
    }

    #[test]
    fn movements_list_newest_effective_date_first() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let actor = UserId::new();
        let item = product(&ledger, tenant, "CAL-38", 0, 0);

        let first = ledger.record_entry(tenant, actor, entry(item, 1, day(3, 5))).unwrap();
        let backdated = ledger.record_entry(tenant, actor, entry(item, 2, day(3, 1))).unwrap();
        let second = ledger.record_entry(tenant, actor, entry(item, 3, day(3, 5))).unwrap();

        let listed = ledger.list_movements(tenant, &MovementFilter::default()).unwrap();
        let numbers: Vec<_> = listed.iter().map(|m| m.number.clone()).collect();
        assert_eq!(numbers, vec![second.number, first.number, backdated.number]);
    }

    #[test]
    fn filters_narrow_the_listing_and_reject_inverted_ranges() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let actor = UserId::new();
        let shirt = product(&ledger, tenant, "CAM-P", 10, 0);
        let ana = employee(&ledger, tenant, "Ana");
        ledger.record_exit(tenant, actor, deliver(shirt, ana, 2)).unwrap();
        ledger.record_entry(tenant, actor, entry(shirt, 5, day(3, 20))).unwrap();

        let deliveries = MovementFilter {
            kind: Some(MovementKind::Delivered),
            ..MovementFilter::default()
        };
        assert_eq!(ledger.list_movements(tenant, &deliveries).unwrap().len(), 1);

        let march = MovementFilter {
            range: stockroom_ledger::DateRange::new(Some(day(3, 1)), Some(day(3, 15))).unwrap(),
            ..MovementFilter::default()
        };
        assert_eq!(ledger.list_movements(tenant, &march).unwrap().len(), 1);

        let medications = MovementFilter {
            category: Some(ProductCategory::Medication),
            ..MovementFilter::default()
        };
        assert!(ledger.list_movements(tenant, &medications).unwrap().is_empty());

        let mut inverted = MovementFilter::default();
        inverted.range.from = Some(day(3, 15));
        inverted.range.to = Some(day(3, 1));
        assert!(matches!(ledger.list_movements(tenant, &inverted), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn dashboard_reflects_the_month_and_low_stock() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let actor = UserId::new();
        let shirt = product(&ledger, tenant, "CAM-G", 20, 5);
        let gloves = ledger
            .register_product(
                tenant,
                actor,
                NewProduct {
                    code: "LUVA-P".to_string(),
                    name: "Luva P".to_string(),
                    category: ProductCategory::Uniform,
                    unit: "par".to_string(),
                    minimum_stock: 5,
                    opening_stock: Some(3),
                    opening_date: Some(day(3, 1)),
                },
            )
            .unwrap()
            .product_id;
        let empty = product(&ledger, tenant, "DIPIRONA", 0, 2);
        let ana = employee(&ledger, tenant, "Ana");

        ledger.record_exit(tenant, actor, deliver(shirt, ana, 2)).unwrap();
        ledger.record_entry(tenant, actor, entry(shirt, 5, day(3, 12))).unwrap();
        let returned = ledger
            .record_exit(
                tenant,
                actor,
                ExitRequest {
                    effective_date: day(3, 14),
                    ..give_back(shirt, ana, 1)
                },
            )
            .unwrap();

        let stats = ledger.dashboard(tenant, day(3, 15)).unwrap();
        assert_eq!(stats.total_stock, 24 + 3);
        assert_eq!(stats.active_products, 3);
        assert_eq!(stats.entries_this_month, 2);
        assert_eq!(stats.deliveries_this_month, 1);
        assert_eq!(stats.returns_this_month, 1);
        assert_eq!(stats.low_stock_alerts, 2);
        let low: Vec<_> = stats.low_stock_products.iter().map(|r| r.product_id).collect();
        assert_eq!(low, vec![empty, gloves]);
        assert_eq!(stats.recent_activity.len(), 5);
        assert_eq!(stats.recent_activity[0].number, returned.number.as_str());
        assert_eq!(stats.recent_activity[0].employee_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn report_rows_carry_labels_and_summary_totals() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let actor = UserId::new();
        let shirt = product(&ledger, tenant, "CAM-XG", 10, 0);
        let ana = employee(&ledger, tenant, "Ana");
        ledger.record_exit(tenant, actor, deliver(shirt, ana, 4)).unwrap();
        ledger.record_exit(tenant, actor, give_back(shirt, ana, 1)).unwrap();

        let rows = ledger.report_rows(tenant, &MovementFilter::default()).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.product_code == "CAM-XG"));
        let delivery = rows.iter().find(|r| r.kind == MovementKind::Delivered).unwrap();
        assert_eq!(delivery.employee_name.as_deref(), Some("Ana"));
        assert_eq!(delivery.signature.as_deref(), Some("J. Silva"));

        let summary = ledger.report_summary(tenant, &MovementFilter::default()).unwrap();
        assert_eq!(summary.total_movements, 3);
        assert_eq!(summary.total_deliveries, 1);
        assert_eq!(summary.quantity_in, 11);
        assert_eq!(summary.quantity_out, 4);
        assert_eq!(summary.net_change(), 7);
    }

    #[test]
    fn product_codes_are_unique_per_tenant_ignoring_case() {
        let ledger = ledger();
        let tenant = TenantId::new();
        product(&ledger, tenant, "CAM-M", 0, 0);

        let again = NewProduct {
            code: " cam-m ".to_string(),
            name: "Camisa M".to_string(),
            category: ProductCategory::Uniform,
            unit: "un".to_string(),
            minimum_stock: 0,
            opening_stock: None,
            opening_date: None,
        };
        assert_eq!(
            ledger.register_product(tenant, UserId::new(), again.clone()),
            Err(LedgerError::DuplicateProductCode("CAM-M".to_string()))
        );
        assert!(ledger.register_product(TenantId::new(), UserId::new(), again).is_ok());
    }

    #[test]
    fn exits_require_known_active_parties() {
        let ledger = ledger();
        let tenant = TenantId::new();
        let actor = UserId::new();
        let shirt = product(&ledger, tenant, "CAM-PP", 10, 0);
        let ana = employee(&ledger, tenant, "Ana");
        let stranger = stockroom_ledger::EmployeeId::new(stockroom_core::AggregateId::new());

        assert_eq!(
            ledger.record_exit(tenant, actor, deliver(shirt, ana, 0)),
            Err(LedgerError::InvalidQuantity(0))
        );
        assert_eq!(
            ledger.record_exit(tenant, actor, deliver(shirt, stranger, 1)),
            Err(LedgerError::UnknownEmployee)
        );

        ledger.set_employee_active(tenant, ana, false).unwrap();
        assert_eq!(
            ledger.record_exit(tenant, actor, deliver(shirt, ana, 1)),
            Err(LedgerError::UnknownEmployee)
        );
        ledger.set_employee_active(tenant, ana, true).unwrap();

        ledger.set_product_active(tenant, actor, shirt, false).unwrap();
        assert_eq!(
            ledger.record_exit(tenant, actor, deliver(shirt, ana, 1)),
            Err(LedgerError::UnknownProduct)
        );
        assert_eq!(
            ledger.record_entry(tenant, actor, entry(shirt, 1, day(3, 1))),
            Err(LedgerError::UnknownProduct)
        );
        assert!(ledger.list_products(tenant, &ProductQuery::default()).is_empty());

        let unknown = ProductId::new(stockroom_core::AggregateId::new());
        assert_eq!(ledger.get_stock_status(tenant, unknown), Err(LedgerError::UnknownProduct));
        assert_eq!(ledger.get_stock_status(tenant, shirt).unwrap().level, 10);
    }

    #[test]
    fn tenants_do_not_see_each_other() {
        let ledger = ledger();
        let acme = TenantId::new();
        let globex = TenantId::new();
        let shirt = product(&ledger, acme, "CAM-M", 10, 0);

        assert_eq!(ledger.get_stock_status(globex, shirt), Err(LedgerError::UnknownProduct));
        assert!(ledger.list_products(globex, &ProductQuery::default()).is_empty());
        assert!(ledger.list_movements(globex, &MovementFilter::default()).unwrap().is_empty());
        assert_eq!(
            ledger.record_entry(globex, UserId::new(), entry(shirt, 1, day(3, 1))),
            Err(LedgerError::UnknownProduct)
        );
    }

    #[test]
    fn committed_movements_are_published() {
        let ledger = ledger();
        let sub = ledger.bus().subscribe();
        let tenant = TenantId::new();
        let item = product(&ledger, tenant, "MASC-01", 0, 0);
        ledger.record_entry(tenant, UserId::new(), entry(item, 2, day(3, 1))).unwrap();

        let registered = sub.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(registered.aggregate_type(), "ledger.product");
        assert_eq!(registered.sequence_number(), 1);
        let recorded = sub.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(recorded.aggregate_id(), item.0);
        assert_eq!(recorded.sequence_number(), 2);
    }

    #[test]
    fn read_models_rebuild_from_the_store() {
        let store = Arc::new(InMemoryEventStore::new());
        let writer = StockLedger::new(store.clone(), InMemoryEventBus::new(), LedgerConfig::default());
        let tenant = TenantId::new();
        let shirt = product(&writer, tenant, "CAM-M", 10, 3);
        let ana = employee(&writer, tenant, "Ana");
        writer.record_exit(tenant, UserId::new(), deliver(shirt, ana, 8)).unwrap();

        let fresh = StockLedger::new(store, InMemoryEventBus::new(), LedgerConfig::default());
        assert!(fresh.get_product(tenant, shirt).is_err());
        assert_eq!(fresh.rebuild_read_models().unwrap(), 4);

        let rebuilt = fresh.get_product(tenant, shirt).unwrap();
        assert_eq!(rebuilt.current_stock, 2);
        assert_eq!(rebuilt.stock_status, StockStatus::LowStock);
        assert_eq!(fresh.get_employee(tenant, ana).unwrap().name, "Ana");
        assert_eq!(fresh.list_movements(tenant, &MovementFilter::default()).unwrap().len(), 2);
        assert_eq!(fresh.low_stock(tenant).len(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Restock(i64),
        Deliver(i64),
        GiveBack(i64),
    }

    fn op() -> impl proptest::strategy::Strategy<Value = Op> {
        use proptest::prelude::*;
        prop_oneof![
            (1i64..8).prop_map(Op::Restock),
            (1i64..12).prop_map(Op::Deliver),
            (1i64..6).prop_map(Op::GiveBack),
        ]
    }

    proptest::proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn stock_always_equals_the_signed_sum_of_its_movements(
            ops in proptest::collection::vec(op(), 1..24),
        ) {
            let ledger = ledger();
            let tenant = TenantId::new();
            let actor = UserId::new();
            let item = product(&ledger, tenant, "GUANTE-L", 5, 2);
            let ana = employee(&ledger, tenant, "Ana");

            for op in ops {
                let before = ledger.get_stock_status(tenant, item).unwrap().level;
                let result = match op {
                    Op::Restock(q) => ledger.record_entry(tenant, actor, entry(item, q, day(3, 2))),
                    Op::Deliver(q) => ledger.record_exit(tenant, actor, deliver(item, ana, q)),
                    Op::GiveBack(q) => ledger.record_exit(tenant, actor, give_back(item, ana, q)),
                };
                if let Err(e) = result {
                    let business_rejection = matches!(
                        e,
                        LedgerError::InsufficientStock { .. } | LedgerError::ReturnExceedsDelivered { .. }
                    );
                    proptest::prop_assert!(business_rejection, "unexpected error: {:?}", e);
                    proptest::prop_assert_eq!(ledger.get_stock_status(tenant, item).unwrap().level, before);
                }

                let level = ledger.get_stock_status(tenant, item).unwrap().level;
                let listed = ledger
                    .list_movements(tenant, &MovementFilter { product_id: Some(item), ..MovementFilter::default() })
                    .unwrap();
                let signed: i64 = listed.iter().map(|m| m.signed_quantity()).sum();
                proptest::prop_assert!(level >= 0);
                proptest::prop_assert_eq!(level, signed);
                proptest::prop_assert_eq!(ledger.get_product(tenant, item).unwrap().current_stock, level);
            }
        }
    }
}

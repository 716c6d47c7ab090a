//! The stock ledger service: the one place where stock changes.
//!
//! Every write runs the same critical section for its product:
//!
//! ```text
//! lock (tenant, product)
//!   loop: load stream → decide → append(Exact(version))
//!         Concurrency → back off, reload, decide again (bounded)
//!   apply committed events to the read models
//! unlock
//! ```
//!
//! The keyed lock serializes writers inside this process; the expected
//! version catches writers in other processes sharing the same store.
//! Exits check their employee against the committed employee stream inside
//! the same critical section, so a replica never trusts a stale read model
//! for that decision.
//!
//! Read models are fed by this process's commits. Commits made by other
//! processes arrive through [`StockLedger::sync_read_models`], which callers
//! run periodically; until then listings and reports may lag behind.
//! Business rejections (`InsufficientStock`, `MissingSignature`, ...) return
//! on the first attempt and are never retried.

mod clock;
mod reports;
mod requests;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use tracing::instrument;

use stockroom_core::{AggregateId, TenantId, UserId};
use stockroom_events::{EventBus, EventEnvelope};
use stockroom_ledger::{
    DashboardStats, DateRange, DeactivateEmployee, DeactivateProduct, Employee, EmployeeCommand,
    EmployeeId, LedgerError, LedgerResult, Movement, MovementFilter, MovementId,
    MovementReportRow, MovementStamp, Movements, OpeningBalance, Product, ProductCode,
    ProductCommand, ProductId, ReactivateEmployee, ReactivateProduct, RecordEntry, RecordExit,
    RegisterEmployee, RegisterProduct, ReportSummary, StockStatusReport, UpdateProductDetails,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError, DispatchOutcome};
use crate::config::LedgerConfig;
use crate::event_store::{EventStore, StoredEvent};
use crate::locks::KeyedLocks;
use crate::projections::{
    EmployeeDirectoryProjection, EmployeeQuery, EmployeeReadModel, MovementLedgerProjection,
    ProductCatalogProjection, ProductQuery, ProductReadModel, ProjectionError, aggregate_types,
};
use crate::read_model::InMemoryTenantStore;
use crate::retry::RetryPolicy;

pub use clock::MonotonicClock;
pub use reports::Labels;
pub use requests::{EntryRequest, ExitRequest, NewEmployee, NewProduct, ProductChanges};

type Catalog = ProductCatalogProjection<InMemoryTenantStore<ProductId, ProductReadModel>>;
type MovementLog = MovementLedgerProjection<InMemoryTenantStore<MovementId, Movement>>;
type Directory = EmployeeDirectoryProjection<InMemoryTenantStore<EmployeeId, EmployeeReadModel>>;

pub struct StockLedger<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    config: LedgerConfig,
    retry: RetryPolicy,
    clock: MonotonicClock,
    product_locks: KeyedLocks<(TenantId, ProductId)>,
    code_locks: KeyedLocks<(TenantId, String)>,
    catalog: Catalog,
    movements: MovementLog,
    employees: Directory,
}

impl<S, B> std::fmt::Debug for StockLedger<S, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockLedger").field("config", &self.config).finish_non_exhaustive()
    }
}

fn locked<K, R>(locks: &KeyedLocks<K>, key: &K, f: impl FnOnce() -> LedgerResult<R>) -> LedgerResult<R>
where
    K: Eq + std::hash::Hash + Clone,
{
    locks
        .with_lock(key, f)
        .map_err(|e| LedgerError::Store(e.to_string()))?
}

fn store_failure<E: std::fmt::Debug>(err: DispatchError<E>) -> LedgerError {
    LedgerError::Store(format!("{err:?}"))
}

fn recorded_movement(outcome: &DispatchOutcome<Product>) -> LedgerResult<Movement> {
    outcome
        .events
        .iter()
        .find_map(|e| e.movement().cloned())
        .ok_or_else(|| LedgerError::Store("commit did not contain a movement".to_string()))
}

impl<S, B> StockLedger<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B, config: LedgerConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            retry: config.retry_policy(),
            config,
            clock: MonotonicClock::new(),
            product_locks: KeyedLocks::new(),
            code_locks: KeyedLocks::new(),
            catalog: ProductCatalogProjection::new(InMemoryTenantStore::new()),
            movements: MovementLedgerProjection::new(InMemoryTenantStore::new()),
            employees: EmployeeDirectoryProjection::new(InMemoryTenantStore::new()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        self.dispatcher.bus()
    }

    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    // ---- movements -------------------------------------------------------

    /// Receive goods into stock.
    #[instrument(skip_all, fields(%tenant_id, product_id = %request.product_id, quantity = request.quantity))]
    pub fn record_entry(&self, tenant_id: TenantId, actor: UserId, request: EntryRequest) -> LedgerResult<Movement> {
        let outcome = self.execute_product(tenant_id, request.product_id, actor, |stamp| {
            ProductCommand::RecordEntry(RecordEntry {
                tenant_id,
                product_id: request.product_id,
                quantity: request.quantity,
                supplier: request.supplier.clone(),
                effective_date: request.effective_date,
                notes: request.notes.clone(),
                stamp,
            })
        })?;
        let movement = recorded_movement(&outcome)?;
        tracing::info!(number = %movement.number, stock = outcome.aggregate.current_stock(), "entry recorded");
        Ok(movement)
    }

    /// Deliver goods to an employee or take a return back.
    #[instrument(
        skip_all,
        fields(%tenant_id, product_id = %request.product_id, employee_id = %request.employee_id, kind = ?request.kind, quantity = request.quantity)
    )]
    pub fn record_exit(&self, tenant_id: TenantId, actor: UserId, request: ExitRequest) -> LedgerResult<Movement> {
        if request.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(request.quantity));
        }

        let employee_id = request.employee_id;
        let check = || self.require_active_employee(tenant_id, employee_id);
        let outcome = self.execute_product_checked(tenant_id, request.product_id, actor, check, |stamp| {
            ProductCommand::RecordExit(RecordExit {
                tenant_id,
                product_id: request.product_id,
                employee_id: request.employee_id,
                quantity: request.quantity,
                kind: request.kind,
                effective_date: request.effective_date,
                signature: request.signature.clone(),
                notes: request.notes.clone(),
                stamp,
            })
        })?;
        let movement = recorded_movement(&outcome)?;
        tracing::info!(number = %movement.number, stock = outcome.aggregate.current_stock(), "exit recorded");
        Ok(movement)
    }

    /// Stock level and alert state, read from the committed stream.
    pub fn get_stock_status(&self, tenant_id: TenantId, product_id: ProductId) -> LedgerResult<StockStatusReport> {
        let product = self.load_product(tenant_id, product_id)?;
        if !product.is_registered() {
            return Err(LedgerError::UnknownProduct);
        }
        Ok(product.stock_report())
    }

    /// Filtered snapshot in listing order (effective date desc, recorded_at desc).
    pub fn list_movements(&self, tenant_id: TenantId, filter: &MovementFilter) -> LedgerResult<Movements> {
        DateRange::new(filter.range.from, filter.range.to)?;
        let categories: HashMap<_, _> = self
            .catalog
            .list(tenant_id, &ProductQuery {
                include_inactive: true,
                ..ProductQuery::default()
            })
            .into_iter()
            .map(|p| (p.product_id, p.category))
            .collect();

        let matching = self
            .movements
            .all(tenant_id)
            .into_iter()
            .filter(|m| filter.matches(m, categories.get(&m.product_id).copied()))
            .collect();
        Ok(Movements::collect(matching))
    }

    // ---- catalog ---------------------------------------------------------

    #[instrument(skip_all, fields(%tenant_id, code = %request.code))]
    pub fn register_product(&self, tenant_id: TenantId, actor: UserId, request: NewProduct) -> LedgerResult<ProductReadModel> {
        let code = ProductCode::parse(&request.code)?;
        let key = (tenant_id, code.as_str().to_string());

        locked(&self.code_locks, &key, || {
            if self.catalog.find_by_code(tenant_id, code.as_str()).is_some() {
                return Err(LedgerError::DuplicateProductCode(code.to_string()));
            }

            let product_id = ProductId::new(AggregateId::new());
            let opening_date = request.opening_date.unwrap_or_else(|| self.clock.today());
            self.execute_product(tenant_id, product_id, actor, |stamp| {
                ProductCommand::RegisterProduct(RegisterProduct {
                    tenant_id,
                    product_id,
                    code: code.as_str().to_string(),
                    name: request.name.clone(),
                    category: request.category,
                    unit: request.unit.clone(),
                    minimum_stock: request.minimum_stock,
                    occurred_at: stamp.recorded_at,
                    opening: request.opening_stock.map(|quantity| OpeningBalance {
                        quantity,
                        effective_date: opening_date,
                        stamp,
                    }),
                })
            })?;

            tracing::info!(%product_id, "product registered");
            self.require_product(tenant_id, product_id)
        })
    }

    pub fn update_product(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        product_id: ProductId,
        changes: ProductChanges,
    ) -> LedgerResult<ProductReadModel> {
        self.execute_product(tenant_id, product_id, actor, |stamp| {
            ProductCommand::UpdateProductDetails(UpdateProductDetails {
                tenant_id,
                product_id,
                name: changes.name.clone(),
                unit: changes.unit.clone(),
                minimum_stock: changes.minimum_stock,
                occurred_at: stamp.recorded_at,
            })
        })?;
        self.require_product(tenant_id, product_id)
    }

    pub fn set_product_active(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        product_id: ProductId,
        active: bool,
    ) -> LedgerResult<ProductReadModel> {
        self.execute_product(tenant_id, product_id, actor, |stamp| {
            if active {
                ProductCommand::ReactivateProduct(ReactivateProduct {
                    tenant_id,
                    product_id,
                    occurred_at: stamp.recorded_at,
                })
            } else {
                ProductCommand::DeactivateProduct(DeactivateProduct {
                    tenant_id,
                    product_id,
                    occurred_at: stamp.recorded_at,
                })
            }
        })?;
        self.require_product(tenant_id, product_id)
    }

    pub fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> LedgerResult<ProductReadModel> {
        self.require_product(tenant_id, product_id)
    }

    pub fn list_products(&self, tenant_id: TenantId, query: &ProductQuery) -> Vec<ProductReadModel> {
        self.catalog.list(tenant_id, query)
    }

    pub fn low_stock(&self, tenant_id: TenantId) -> Vec<ProductReadModel> {
        self.catalog.low_stock(tenant_id)
    }

    // ---- employees -------------------------------------------------------

    #[instrument(skip_all, fields(%tenant_id))]
    pub fn register_employee(&self, tenant_id: TenantId, request: NewEmployee) -> LedgerResult<EmployeeReadModel> {
        let employee_id = EmployeeId::new(AggregateId::new());
        let command = EmployeeCommand::RegisterEmployee(RegisterEmployee {
            tenant_id,
            employee_id,
            name: request.name,
            email: request.email,
            area: request.area,
            position: request.position,
            occurred_at: self.clock.now(),
        });
        self.execute_employee(tenant_id, employee_id, &command)?;
        self.require_employee(tenant_id, employee_id)
    }

    pub fn set_employee_active(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        active: bool,
    ) -> LedgerResult<EmployeeReadModel> {
        let occurred_at = self.clock.now();
        let command = if active {
            EmployeeCommand::ReactivateEmployee(ReactivateEmployee {
                tenant_id,
                employee_id,
                occurred_at,
            })
        } else {
            EmployeeCommand::DeactivateEmployee(DeactivateEmployee {
                tenant_id,
                employee_id,
                occurred_at,
            })
        };
        self.execute_employee(tenant_id, employee_id, &command)?;
        self.require_employee(tenant_id, employee_id)
    }

    pub fn get_employee(&self, tenant_id: TenantId, employee_id: EmployeeId) -> LedgerResult<EmployeeReadModel> {
        self.require_employee(tenant_id, employee_id)
    }

    pub fn list_employees(&self, tenant_id: TenantId, query: &EmployeeQuery) -> Vec<EmployeeReadModel> {
        self.employees.list(tenant_id, query)
    }

    // ---- reports ---------------------------------------------------------

    pub fn report_rows(&self, tenant_id: TenantId, filter: &MovementFilter) -> LedgerResult<Vec<MovementReportRow>> {
        let movements = self.list_movements(tenant_id, filter)?;
        let (products, employees) = self.label_sources(tenant_id);
        Ok(reports::report_rows(&movements, &Labels::new(&products, &employees)))
    }

    pub fn report_summary(&self, tenant_id: TenantId, filter: &MovementFilter) -> LedgerResult<ReportSummary> {
        Ok(self.list_movements(tenant_id, filter)?.iter().collect())
    }

    pub fn dashboard(&self, tenant_id: TenantId, today: NaiveDate) -> LedgerResult<DashboardStats> {
        let movements = self.list_movements(tenant_id, &MovementFilter::default())?;
        let (products, employees) = self.label_sources(tenant_id);
        Ok(reports::dashboard(
            &products,
            &movements,
            &Labels::new(&products, &employees),
            today,
            self.config.recent_activity_limit,
        ))
    }

    // ---- read models -----------------------------------------------------

    /// Replay the whole store into fresh read models. Returns the number of events replayed.
    #[instrument(skip(self))]
    pub fn rebuild_read_models(&self) -> LedgerResult<usize> {
        let events = self
            .dispatcher
            .store()
            .load_all()
            .map_err(|e| LedgerError::Store(e.to_string()))?;
        let envelopes: Vec<_> = events.iter().map(StoredEvent::to_envelope).collect();

        let to_store = |e: ProjectionError| LedgerError::Store(e.to_string());
        self.catalog.rebuild_from_scratch(&envelopes).map_err(to_store)?;
        self.movements.rebuild_from_scratch(&envelopes).map_err(to_store)?;
        self.employees.rebuild_from_scratch(&envelopes).map_err(to_store)?;

        tracing::info!(events = envelopes.len(), "read models rebuilt");
        Ok(envelopes.len())
    }

    /// Fold events committed by other processes into the read models.
    ///
    /// Streams already applied are skipped by their cursors and a stream this
    /// process has only partly seen is replayed from its start. Returns the
    /// number of newly applied events.
    #[instrument(skip(self))]
    pub fn sync_read_models(&self) -> LedgerResult<usize> {
        let events = self
            .dispatcher
            .store()
            .load_all()
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        let mut applied = 0;
        for stored in &events {
            match self.apply_envelope(&stored.to_envelope()) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(ProjectionError::Gap { .. }) => {
                    applied += self.catch_up(stored.tenant_id, stored.aggregate_id);
                }
                Err(err) => return Err(LedgerError::Store(err.to_string())),
            }
        }

        if applied > 0 {
            tracing::info!(applied, "read models caught up with the store");
        }
        Ok(applied)
    }

    /// Apply an envelope that arrived from the bus (e.g. written by another process).
    /// Returns whether any read model changed.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        let product = self.catalog.apply_envelope(envelope)?;
        let movement = self.movements.apply_envelope(envelope)?;
        let employee = self.employees.apply_envelope(envelope)?;
        Ok(product || movement || employee)
    }

    // ---- internals -------------------------------------------------------

    fn execute_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        actor: UserId,
        build: impl Fn(MovementStamp) -> ProductCommand,
    ) -> LedgerResult<DispatchOutcome<Product>> {
        self.execute_product_checked(tenant_id, product_id, actor, || Ok(()), build)
    }

    /// `check` runs under the product lock before every attempt.
    fn execute_product_checked(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        actor: UserId,
        check: impl Fn() -> LedgerResult<()>,
        build: impl Fn(MovementStamp) -> ProductCommand,
    ) -> LedgerResult<DispatchOutcome<Product>> {
        locked(&self.product_locks, &(tenant_id, product_id), || {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                check()?;
                let stamp = MovementStamp {
                    movement_id: MovementId::new(),
                    recorded_at: self.clock.now(),
                    recorded_by: actor,
                };
                let command = build(stamp);

                match self.dispatcher.dispatch(
                    tenant_id,
                    product_id.0,
                    aggregate_types::PRODUCT,
                    &command,
                    |_, id| Product::empty(ProductId::new(id)),
                ) {
                    Ok(outcome) => {
                        self.project(&outcome.committed);
                        return Ok(outcome);
                    }
                    Err(DispatchError::Rejected(err)) => {
                        tracing::info!(code = err.code(), error = %err, "command rejected");
                        return Err(err);
                    }
                    Err(DispatchError::Concurrency(msg)) => {
                        if !self.retry.should_retry(attempt) {
                            tracing::warn!(attempt, %msg, "giving up after repeated write conflicts");
                            return Err(LedgerError::ConcurrentUpdateConflict { attempts: attempt });
                        }
                        tracing::debug!(attempt, %msg, "write conflict; reloading stream");
                        std::thread::sleep(self.retry.delay_after(attempt));
                    }
                    Err(other) => return Err(store_failure(other)),
                }
            }
        })
    }

    fn execute_employee(&self, tenant_id: TenantId, employee_id: EmployeeId, command: &EmployeeCommand) -> LedgerResult<()> {
        let outcome = self
            .dispatcher
            .dispatch(tenant_id, employee_id.0, aggregate_types::EMPLOYEE, command, |_, id| {
                Employee::empty(EmployeeId::new(id))
            })
            .map_err(|err| match err {
                DispatchError::Rejected(domain) => LedgerError::from(domain),
                DispatchError::Concurrency(msg) => LedgerError::Conflict(msg),
                other => store_failure(other),
            })?;
        self.project(&outcome.committed);
        Ok(())
    }

    fn load_product(&self, tenant_id: TenantId, product_id: ProductId) -> LedgerResult<Product> {
        self.dispatcher
            .load(tenant_id, product_id.0, |_, id| Product::empty(ProductId::new(id)))
            .map_err(store_failure)
    }

    fn require_product(&self, tenant_id: TenantId, product_id: ProductId) -> LedgerResult<ProductReadModel> {
        self.catalog.get(tenant_id, &product_id).ok_or(LedgerError::UnknownProduct)
    }

    fn require_employee(&self, tenant_id: TenantId, employee_id: EmployeeId) -> LedgerResult<EmployeeReadModel> {
        self.employees.get(tenant_id, &employee_id).ok_or(LedgerError::UnknownEmployee)
    }

    /// Unknown and inactive employees are both `UnknownEmployee`.
    ///
    /// Decided on the committed employee stream. A deactivation committed after
    /// this read but before the movement's append is not seen; the movement is
    /// then ordered before the deactivation.
    fn require_active_employee(&self, tenant_id: TenantId, employee_id: EmployeeId) -> LedgerResult<()> {
        let employee = self
            .dispatcher
            .load(tenant_id, employee_id.0, |_, id| Employee::empty(EmployeeId::new(id)))
            .map_err(|err| match err {
                // The id names some other kind of stream.
                DispatchError::Deserialize(_) => LedgerError::UnknownEmployee,
                other => store_failure(other),
            })?;
        if !employee.can_receive() {
            return Err(LedgerError::UnknownEmployee);
        }

        let projected = self.employees.get(tenant_id, &employee_id);
        if projected.is_none_or(|e| !e.is_active()) {
            self.catch_up(tenant_id, employee_id.0);
        }
        Ok(())
    }

    fn label_sources(&self, tenant_id: TenantId) -> (Vec<ProductReadModel>, Vec<EmployeeReadModel>) {
        let products = self.catalog.list(tenant_id, &ProductQuery {
            include_inactive: true,
            ..ProductQuery::default()
        });
        let employees = self.employees.list(tenant_id, &EmployeeQuery {
            include_inactive: true,
            ..EmployeeQuery::default()
        });
        (products, employees)
    }

    /// Bring the read models up to date with a commit.
    ///
    /// A gap means another process appended to the stream since we last saw it;
    /// the whole stream is replayed (already-applied events are skipped).
    fn project(&self, committed: &[StoredEvent]) {
        for stored in committed {
            match self.apply_envelope(&stored.to_envelope()) {
                Ok(_) => {}
                Err(ProjectionError::Gap { .. }) => {
                    self.catch_up(stored.tenant_id, stored.aggregate_id);
                }
                Err(err) => tracing::error!(event_id = %stored.event_id, error = %err, "projection failed"),
            }
        }
    }

    /// Replay one stream into the read models. Returns the number of newly applied events.
    fn catch_up(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> usize {
        let stream = match self.dispatcher.store().load_stream(tenant_id, aggregate_id) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(%aggregate_id, error = %err, "could not load stream to catch up read models");
                return 0;
            }
        };
        let mut applied = 0;
        for stored in &stream {
            match self.apply_envelope(&stored.to_envelope()) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(event_id = %stored.event_id, error = %err, "catch-up projection failed");
                    break;
                }
            }
        }
        applied
    }
}

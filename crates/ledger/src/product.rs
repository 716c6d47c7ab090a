use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, AggregateId, AggregateRoot, TenantId, ValueObject};
use stockroom_events::Event;

use crate::employee::EmployeeId;
use crate::error::LedgerError;
use crate::movement::{
    ExitKind, Movement, MovementKind, MovementNumber, MovementStamp, Quantity, Signature,
};
use crate::status::{StockStatus, StockStatusReport};

/// Product identifier (one event stream per product).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Unique, human-readable SKU. Stored upper-cased so uniqueness is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    pub const MAX_LEN: usize = 32;

    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(LedgerError::validation("product code cannot be empty"));
        }
        if code.chars().count() > Self::MAX_LEN {
            return Err(LedgerError::validation(format!(
                "product code cannot exceed {} characters",
                Self::MAX_LEN
            )));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(LedgerError::validation("product code cannot contain whitespace"));
        }
        Ok(Self(code.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for ProductCode {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Uniform,
    Medication,
}

impl ProductCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductCategory::Uniform => "uniform",
            ProductCategory::Medication => "medication",
        }
    }
}

impl core::str::FromStr for ProductCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" | "uniforme" => Ok(ProductCategory::Uniform),
            "medication" | "medicamento" => Ok(ProductCategory::Medication),
            other => Err(LedgerError::validation(format!(
                "unknown category '{other}' (expected uniform or medication)"
            ))),
        }
    }
}

/// Products are never deleted, only deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

/// Aggregate root: Product.
///
/// `current_stock` has no setter. It changes only in `apply` of a
/// `MovementRecorded` event, which is what keeps it equal to the sum of the
/// signed quantities in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    tenant_id: Option<TenantId>,
    code: String,
    name: String,
    category: ProductCategory,
    unit: String,
    minimum_stock: i64,
    current_stock: i64,
    status: ProductStatus,
    /// Delivered minus returned, per employee. Bounds returns.
    outstanding: BTreeMap<EmployeeId, i64>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            code: String::new(),
            name: String::new(),
            category: ProductCategory::Uniform,
            unit: String::new(),
            minimum_stock: 0,
            current_stock: 0,
            status: ProductStatus::Inactive,
            outstanding: BTreeMap::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_registered(&self) -> bool {
        self.created
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ProductCategory {
        self.category
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn current_stock(&self) -> i64 {
        self.current_stock
    }

    pub fn minimum_stock(&self) -> i64 {
        self.minimum_stock
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.created && self.status == ProductStatus::Active
    }

    /// Quantity of this product an employee still holds (delivered − returned).
    pub fn outstanding_for(&self, employee_id: EmployeeId) -> i64 {
        self.outstanding.get(&employee_id).copied().unwrap_or(0)
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.current_stock, self.minimum_stock)
    }

    pub fn stock_report(&self) -> StockStatusReport {
        StockStatusReport {
            product_id: self.id,
            code: self.code.clone(),
            level: self.current_stock,
            minimum: self.minimum_stock,
            status: self.stock_status(),
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Opening count recorded as the product's first entry movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningBalance {
    pub quantity: i64,
    pub effective_date: NaiveDate,
    pub stamp: MovementStamp,
}

/// Command: RegisterProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
    pub minimum_stock: i64,
    pub opening: Option<OpeningBalance>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProductDetails. `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProductDetails {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub minimum_stock: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordEntry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub supplier: String,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
    pub stamp: MovementStamp,
}

/// Command: RecordExit.
///
/// Whether the employee may receive goods is checked by the caller against
/// the employee stream; the product aggregate only sees the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordExit {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub employee_id: EmployeeId,
    pub quantity: i64,
    pub kind: ExitKind,
    pub effective_date: NaiveDate,
    pub signature: Option<String>,
    pub notes: Option<String>,
    pub stamp: MovementStamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    RegisterProduct(RegisterProduct),
    UpdateProductDetails(UpdateProductDetails),
    DeactivateProduct(DeactivateProduct),
    ReactivateProduct(ReactivateProduct),
    RecordEntry(RecordEntry),
    RecordExit(RecordExit),
}

/// Event: ProductRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRegistered {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub code: ProductCode,
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
    pub minimum_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDetailsUpdated (carries the full new values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetailsUpdated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub name: String,
    pub unit: String,
    pub minimum_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeactivated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReactivated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecorded {
    pub tenant_id: TenantId,
    pub movement: Movement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductRegistered(ProductRegistered),
    ProductDetailsUpdated(ProductDetailsUpdated),
    ProductDeactivated(ProductDeactivated),
    ProductReactivated(ProductReactivated),
    MovementRecorded(MovementRecorded),
}

impl ProductEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            ProductEvent::ProductRegistered(e) => e.tenant_id,
            ProductEvent::ProductDetailsUpdated(e) => e.tenant_id,
            ProductEvent::ProductDeactivated(e) => e.tenant_id,
            ProductEvent::ProductReactivated(e) => e.tenant_id,
            ProductEvent::MovementRecorded(e) => e.tenant_id,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            ProductEvent::ProductRegistered(e) => e.product_id,
            ProductEvent::ProductDetailsUpdated(e) => e.product_id,
            ProductEvent::ProductDeactivated(e) => e.product_id,
            ProductEvent::ProductReactivated(e) => e.product_id,
            ProductEvent::MovementRecorded(e) => e.movement.product_id,
        }
    }

    pub fn movement(&self) -> Option<&Movement> {
        match self {
            ProductEvent::MovementRecorded(e) => Some(&e.movement),
            _ => None,
        }
    }
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductRegistered(_) => "ledger.product.registered",
            ProductEvent::ProductDetailsUpdated(_) => "ledger.product.details_updated",
            ProductEvent::ProductDeactivated(_) => "ledger.product.deactivated",
            ProductEvent::ProductReactivated(_) => "ledger.product.reactivated",
            ProductEvent::MovementRecorded(_) => "ledger.product.movement_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductRegistered(e) => e.occurred_at,
            ProductEvent::ProductDetailsUpdated(e) => e.occurred_at,
            ProductEvent::ProductDeactivated(e) => e.occurred_at,
            ProductEvent::ProductReactivated(e) => e.occurred_at,
            ProductEvent::MovementRecorded(e) => e.movement.recorded_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductRegistered(e) => {
                self.id = e.product_id;
                self.tenant_id = Some(e.tenant_id);
                self.code = e.code.as_str().to_string();
                self.name = e.name.clone();
                self.category = e.category;
                self.unit = e.unit.clone();
                self.minimum_stock = e.minimum_stock;
                self.current_stock = 0;
                self.status = ProductStatus::Active;
                self.created = true;
            }
            ProductEvent::ProductDetailsUpdated(e) => {
                self.name = e.name.clone();
                self.unit = e.unit.clone();
                self.minimum_stock = e.minimum_stock;
            }
            ProductEvent::ProductDeactivated(_) => {
                self.status = ProductStatus::Inactive;
            }
            ProductEvent::ProductReactivated(_) => {
                self.status = ProductStatus::Active;
            }
            ProductEvent::MovementRecorded(e) => {
                let m = &e.movement;
                // `handle` rejects movements that would overflow, so saturation
                // only guards streams written by something else.
                self.current_stock = self.current_stock.saturating_add(m.signed_quantity());
                if let Some(employee_id) = m.employee_id {
                    let held = self.outstanding.entry(employee_id).or_insert(0);
                    match m.kind {
                        MovementKind::Delivered => *held = held.saturating_add(m.quantity.get()),
                        MovementKind::Returned => *held = held.saturating_sub(m.quantity.get()),
                        MovementKind::Entry => {}
                    }
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::RegisterProduct(cmd) => self.handle_register(cmd),
            ProductCommand::UpdateProductDetails(cmd) => self.handle_update(cmd),
            ProductCommand::DeactivateProduct(cmd) => self.handle_deactivate(cmd),
            ProductCommand::ReactivateProduct(cmd) => self.handle_reactivate(cmd),
            ProductCommand::RecordEntry(cmd) => self.handle_entry(cmd),
            ProductCommand::RecordExit(cmd) => self.handle_exit(cmd),
        }
    }
}

fn clean_text(raw: &str, field: &str) -> Result<String, LedgerError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(LedgerError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

fn clean_optional(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_minimum(minimum_stock: i64) -> Result<i64, LedgerError> {
    if minimum_stock < 0 {
        return Err(LedgerError::validation("minimum stock cannot be negative"));
    }
    Ok(minimum_stock)
}

impl Product {
    fn ensure_target(&self, tenant_id: TenantId, product_id: ProductId) -> Result<(), LedgerError> {
        if !self.created {
            return Err(LedgerError::UnknownProduct);
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(LedgerError::Conflict("tenant mismatch".to_string()));
        }
        if self.id != product_id {
            return Err(LedgerError::Conflict("product_id mismatch".to_string()));
        }
        Ok(())
    }

    /// Movements need a registered product that is still active.
    fn ensure_accepts_movements(&self, tenant_id: TenantId, product_id: ProductId) -> Result<(), LedgerError> {
        self.ensure_target(tenant_id, product_id)?;
        if self.status != ProductStatus::Active {
            return Err(LedgerError::UnknownProduct);
        }
        Ok(())
    }

    fn movement(
        &self,
        kind: MovementKind,
        stamp: &MovementStamp,
        quantity: Quantity,
        effective_date: NaiveDate,
    ) -> Movement {
        Movement {
            id: stamp.movement_id,
            number: MovementNumber::generate(kind, effective_date, stamp.movement_id),
            kind,
            product_id: self.id,
            employee_id: None,
            quantity,
            effective_date,
            recorded_at: stamp.recorded_at,
            recorded_by: stamp.recorded_by,
            signature: None,
            supplier: None,
            notes: None,
        }
    }

    fn handle_register(&self, cmd: &RegisterProduct) -> Result<Vec<ProductEvent>, LedgerError> {
        if self.created {
            return Err(LedgerError::Conflict("product already registered".to_string()));
        }

        let code = ProductCode::parse(&cmd.code)?;
        let name = clean_text(&cmd.name, "name")?;
        let unit = clean_text(&cmd.unit, "unit")?;
        let minimum_stock = check_minimum(cmd.minimum_stock)?;

        let mut events = vec![ProductEvent::ProductRegistered(ProductRegistered {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            code,
            name,
            category: cmd.category,
            unit,
            minimum_stock,
            occurred_at: cmd.occurred_at,
        })];

        if let Some(opening) = &cmd.opening {
            if opening.quantity < 0 {
                return Err(LedgerError::InvalidQuantity(opening.quantity));
            }
            if opening.quantity > 0 {
                let quantity = Quantity::new(opening.quantity)?;
                let mut movement = Self::empty(cmd.product_id).movement(
                    MovementKind::Entry,
                    &opening.stamp,
                    quantity,
                    opening.effective_date,
                );
                movement.supplier = Some("opening balance".to_string());
                events.push(ProductEvent::MovementRecorded(MovementRecorded {
                    tenant_id: cmd.tenant_id,
                    movement,
                }));
            }
        }

        Ok(events)
    }

    fn handle_update(&self, cmd: &UpdateProductDetails) -> Result<Vec<ProductEvent>, LedgerError> {
        self.ensure_target(cmd.tenant_id, cmd.product_id)?;

        let name = match &cmd.name {
            Some(n) => clean_text(n, "name")?,
            None => self.name.clone(),
        };
        let unit = match &cmd.unit {
            Some(u) => clean_text(u, "unit")?,
            None => self.unit.clone(),
        };
        let minimum_stock = match cmd.minimum_stock {
            Some(m) => check_minimum(m)?,
            None => self.minimum_stock,
        };

        if name == self.name && unit == self.unit && minimum_stock == self.minimum_stock {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ProductDetailsUpdated(ProductDetailsUpdated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            name,
            unit,
            minimum_stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateProduct) -> Result<Vec<ProductEvent>, LedgerError> {
        self.ensure_target(cmd.tenant_id, cmd.product_id)?;
        if self.status == ProductStatus::Inactive {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::ProductDeactivated(ProductDeactivated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(&self, cmd: &ReactivateProduct) -> Result<Vec<ProductEvent>, LedgerError> {
        self.ensure_target(cmd.tenant_id, cmd.product_id)?;
        if self.status == ProductStatus::Active {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::ProductReactivated(ProductReactivated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Stock after adding `quantity`; a level that no longer fits is an invalid quantity.
    fn stock_after_adding(&self, quantity: Quantity) -> Result<i64, LedgerError> {
        self.current_stock
            .checked_add(quantity.get())
            .ok_or(LedgerError::InvalidQuantity(quantity.get()))
    }

    fn handle_entry(&self, cmd: &RecordEntry) -> Result<Vec<ProductEvent>, LedgerError> {
        let quantity = Quantity::new(cmd.quantity)?;
        self.ensure_accepts_movements(cmd.tenant_id, cmd.product_id)?;
        self.stock_after_adding(quantity)?;
        let supplier = clean_text(&cmd.supplier, "supplier")?;

        let mut movement = self.movement(MovementKind::Entry, &cmd.stamp, quantity, cmd.effective_date);
        movement.supplier = Some(supplier);
        movement.notes = clean_optional(&cmd.notes);

        Ok(vec![ProductEvent::MovementRecorded(MovementRecorded {
            tenant_id: cmd.tenant_id,
            movement,
        })])
    }

    fn handle_exit(&self, cmd: &RecordExit) -> Result<Vec<ProductEvent>, LedgerError> {
        let quantity = Quantity::new(cmd.quantity)?;
        self.ensure_accepts_movements(cmd.tenant_id, cmd.product_id)?;

        let kind = MovementKind::from(cmd.kind);
        let signature = match cmd.kind {
            ExitKind::Delivered => {
                let signature = Signature::parse(cmd.signature.as_deref())?;
                if self.current_stock < quantity.get() {
                    return Err(LedgerError::InsufficientStock {
                        requested: quantity.get(),
                        available: self.current_stock,
                    });
                }
                Some(signature)
            }
            ExitKind::Returned => {
                let outstanding = self.outstanding_for(cmd.employee_id);
                if quantity.get() > outstanding {
                    return Err(LedgerError::ReturnExceedsDelivered {
                        requested: quantity.get(),
                        outstanding,
                    });
                }
                self.stock_after_adding(quantity)?;
                Signature::parse(cmd.signature.as_deref()).ok()
            }
        };

        let mut movement = self.movement(kind, &cmd.stamp, quantity, cmd.effective_date);
        movement.employee_id = Some(cmd.employee_id);
        movement.signature = signature;
        movement.notes = clean_optional(&cmd.notes);

        Ok(vec![ProductEvent::MovementRecorded(MovementRecorded {
            tenant_id: cmd.tenant_id,
            movement,
        })])
    }
}

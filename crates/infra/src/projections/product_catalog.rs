use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockroom_core::TenantId;
use stockroom_events::EventEnvelope;
use stockroom_ledger::{
    ProductCategory, ProductEvent, ProductId, ProductStatus, StockStatus, StockStatusReport,
};

use super::aggregate_types;
use super::cursor::StreamCursors;
use super::ProjectionError;
use crate::read_model::TenantStore;

/// Queryable catalog entry: product facts plus its current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReadModel {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
    pub minimum_stock: i64,
    pub current_stock: i64,
    pub status: ProductStatus,
    pub stock_status: StockStatus,
    pub updated_at: DateTime<Utc>,
}

impl ProductReadModel {
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn stock_report(&self) -> StockStatusReport {
        StockStatusReport {
            product_id: self.product_id,
            code: self.code.clone(),
            level: self.current_stock,
            minimum: self.minimum_stock,
            status: self.stock_status,
        }
    }

    fn restamp(&mut self, at: DateTime<Utc>) {
        self.stock_status = StockStatus::classify(self.current_stock, self.minimum_stock);
        self.updated_at = at;
    }
}

/// Catalog listing criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category: Option<ProductCategory>,
    /// Case-insensitive match against code or name.
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ProductQuery {
    pub fn matches(&self, p: &ProductReadModel) -> bool {
        if !self.include_inactive && !p.is_active() {
            return false;
        }
        if self.category.is_some_and(|c| c != p.category) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                p.code.to_lowercase().contains(&needle) || p.name.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Product catalog projection over `ledger.product` streams.
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: TenantStore<ProductId, ProductReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: TenantStore<ProductId, ProductReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, product_id: &ProductId) -> Option<ProductReadModel> {
        self.store.get(tenant_id, product_id)
    }

    /// Matching products sorted by code.
    pub fn list(&self, tenant_id: TenantId, query: &ProductQuery) -> Vec<ProductReadModel> {
        let mut products: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|p| query.matches(p))
            .collect();
        products.sort_by(|a, b| a.code.cmp(&b.code));
        products
    }

    /// Code lookup across active and inactive products (codes are never reused).
    pub fn find_by_code(&self, tenant_id: TenantId, code: &str) -> Option<ProductReadModel> {
        self.store
            .list(tenant_id)
            .into_iter()
            .find(|p| p.code.eq_ignore_ascii_case(code))
    }

    /// Active products at or below their minimum, emptiest first.
    pub fn low_stock(&self, tenant_id: TenantId) -> Vec<ProductReadModel> {
        let mut products: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|p| p.is_active() && p.stock_status.is_alert())
            .collect();
        products.sort_by(|a, b| {
            a.current_stock
                .cmp(&b.current_stock)
                .then_with(|| a.code.cmp(&b.code))
        });
        products
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        if envelope.aggregate_type() != aggregate_types::PRODUCT {
            return Ok(false);
        }
        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();

        self.cursors
            .advance_with(tenant_id, aggregate_id, envelope.sequence_number(), || {
                let event: ProductEvent = envelope.decode()
                    .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

                if event.tenant_id() != tenant_id {
                    return Err(ProjectionError::TenantIsolation(
                        "event tenant_id does not match envelope tenant_id".to_string(),
                    ));
                }
                if event.product_id().0 != aggregate_id {
                    return Err(ProjectionError::TenantIsolation(
                        "event product_id does not match envelope aggregate_id".to_string(),
                    ));
                }

                self.apply_event(tenant_id, event);
                Ok(())
            })
    }

    fn apply_event(&self, tenant_id: TenantId, event: ProductEvent) {
        if let ProductEvent::ProductRegistered(e) = event {
            let mut rm = ProductReadModel {
                product_id: e.product_id,
                code: e.code.as_str().to_string(),
                name: e.name,
                category: e.category,
                unit: e.unit,
                minimum_stock: e.minimum_stock,
                current_stock: 0,
                status: ProductStatus::Active,
                stock_status: StockStatus::OutOfStock,
                updated_at: e.occurred_at,
            };
            rm.restamp(e.occurred_at);
            self.store.upsert(tenant_id, e.product_id, rm);
            return;
        }

        let product_id = event.product_id();
        let Some(mut rm) = self.store.get(tenant_id, &product_id) else {
            tracing::warn!(%product_id, "product event before registration; ignored");
            return;
        };

        let at = match event {
            ProductEvent::ProductRegistered(_) => return,
            ProductEvent::ProductDetailsUpdated(e) => {
                rm.name = e.name;
                rm.unit = e.unit;
                rm.minimum_stock = e.minimum_stock;
                e.occurred_at
            }
            ProductEvent::ProductDeactivated(e) => {
                rm.status = ProductStatus::Inactive;
                e.occurred_at
            }
            ProductEvent::ProductReactivated(e) => {
                rm.status = ProductStatus::Active;
                e.occurred_at
            }
            ProductEvent::MovementRecorded(e) => {
                rm.current_stock += e.movement.signed_quantity();
                e.movement.recorded_at
            }
        };
        rm.restamp(at);
        self.store.upsert(tenant_id, product_id, rm);
    }

    /// Drop everything and replay from the given envelopes.
    pub fn rebuild_from_scratch<'a>(
        &self,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.cursors.clear();
        let envelopes: Vec<_> = envelopes.into_iter().collect();
        let mut tenants: Vec<_> = envelopes.iter().map(|e| e.tenant_id()).collect();
        tenants.sort();
        tenants.dedup();
        for t in tenants {
            self.store.clear_tenant(t);
        }
        for env in envelopes {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}

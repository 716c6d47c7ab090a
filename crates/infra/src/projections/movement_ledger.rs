use serde_json::Value as JsonValue;

use stockroom_core::TenantId;
use stockroom_events::EventEnvelope;
use stockroom_ledger::{Movement, MovementId, ProductEvent};

use super::aggregate_types;
use super::cursor::StreamCursors;
use super::ProjectionError;
use crate::read_model::TenantStore;

/// Flat list of every committed movement, across all product streams.
#[derive(Debug)]
pub struct MovementLedgerProjection<S>
where
    S: TenantStore<MovementId, Movement>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> MovementLedgerProjection<S>
where
    S: TenantStore<MovementId, Movement>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, movement_id: &MovementId) -> Option<Movement> {
        self.store.get(tenant_id, movement_id)
    }

    /// Unordered; callers sort into listing order.
    pub fn all(&self, tenant_id: TenantId) -> Vec<Movement> {
        self.store.list(tenant_id)
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        if envelope.aggregate_type() != aggregate_types::PRODUCT {
            return Ok(false);
        }
        let tenant_id = envelope.tenant_id();

        self.cursors
            .advance_with(tenant_id, envelope.aggregate_id(), envelope.sequence_number(), || {
                let event: ProductEvent = envelope.decode()
                    .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

                if event.tenant_id() != tenant_id {
                    return Err(ProjectionError::TenantIsolation(
                        "event tenant_id does not match envelope tenant_id".to_string(),
                    ));
                }

                if let ProductEvent::MovementRecorded(e) = event {
                    if e.movement.product_id.0 != envelope.aggregate_id() {
                        return Err(ProjectionError::TenantIsolation(
                            "movement product_id does not match envelope aggregate_id".to_string(),
                        ));
                    }
                    self.store.upsert(tenant_id, e.movement.id, e.movement);
                }
                Ok(())
            })
    }

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

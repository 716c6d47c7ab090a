use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockroom_core::TenantId;
use stockroom_events::EventEnvelope;
use stockroom_ledger::{EmployeeEvent, EmployeeId, EmployeeStatus};

use super::aggregate_types;
use super::cursor::StreamCursors;
use super::ProjectionError;
use crate::read_model::TenantStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeReadModel {
    pub employee_id: EmployeeId,
    pub name: String,
    pub email: Option<String>,
    pub area: String,
    pub position: String,
    pub status: EmployeeStatus,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeReadModel {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeQuery {
    /// Exact area, case-insensitive.
    pub area: Option<String>,
    /// Case-insensitive match against name or email.
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl EmployeeQuery {
    pub fn matches(&self, e: &EmployeeReadModel) -> bool {
        if !self.include_inactive && !e.is_active() {
            return false;
        }
        if let Some(area) = self.area.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            if !e.area.eq_ignore_ascii_case(area) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                e.name.to_lowercase().contains(&needle)
                    || e.email.as_deref().is_some_and(|m| m.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Employee directory read model over `ledger.employee` streams.
#[derive(Debug)]
pub struct EmployeeDirectoryProjection<S>
where
    S: TenantStore<EmployeeId, EmployeeReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> EmployeeDirectoryProjection<S>
where
    S: TenantStore<EmployeeId, EmployeeReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, tenant_id: TenantId, employee_id: &EmployeeId) -> Option<EmployeeReadModel> {
        self.store.get(tenant_id, employee_id)
    }

    /// Matching employees sorted by name.
    pub fn list(&self, tenant_id: TenantId, query: &EmployeeQuery) -> Vec<EmployeeReadModel> {
        let mut employees: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|e| query.matches(e))
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name));
        employees
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        if envelope.aggregate_type() != aggregate_types::EMPLOYEE {
            return Ok(false);
        }
        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();

        self.cursors
            .advance_with(tenant_id, aggregate_id, envelope.sequence_number(), || {
                let event: EmployeeEvent = envelope.decode()
                    .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

                if event.tenant_id() != tenant_id || event.employee_id().0 != aggregate_id {
                    return Err(ProjectionError::TenantIsolation(
                        "employee event does not match its envelope".to_string(),
                    ));
                }

                match event {
                    EmployeeEvent::EmployeeRegistered(e) => {
                        self.store.upsert(
                            tenant_id,
                            e.employee_id,
                            EmployeeReadModel {
                                employee_id: e.employee_id,
                                name: e.name,
                                email: e.email,
                                area: e.area,
                                position: e.position,
                                status: EmployeeStatus::Active,
                                updated_at: e.occurred_at,
                            },
                        );
                    }
                    EmployeeEvent::EmployeeDeactivated(e) => {
                        self.set_status(tenant_id, e.employee_id, EmployeeStatus::Inactive, e.occurred_at);
                    }
                    EmployeeEvent::EmployeeReactivated(e) => {
                        self.set_status(tenant_id, e.employee_id, EmployeeStatus::Active, e.occurred_at);
                    }
                }
                Ok(())
            })
    }

    fn set_status(&self, tenant_id: TenantId, id: EmployeeId, status: EmployeeStatus, at: DateTime<Utc>) {
        if let Some(mut rm) = self.store.get(tenant_id, &id) {
            rm.status = status;
            rm.updated_at = at;
            self.store.upsert(tenant_id, id, rm);
        }
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

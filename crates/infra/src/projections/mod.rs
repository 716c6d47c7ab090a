//! Read models built from committed ledger events.
//!
//! Every projection here is rebuildable from the event store, tenant-isolated
//! and idempotent under at-least-once delivery (see [`StreamCursors`]).

use thiserror::Error;

pub mod cursor;
pub mod employees;
pub mod movement_ledger;
pub mod product_catalog;

pub use cursor::StreamCursors;
pub use employees::{EmployeeDirectoryProjection, EmployeeQuery, EmployeeReadModel};
pub use movement_ledger::MovementLedgerProjection;
pub use product_catalog::{ProductCatalogProjection, ProductQuery, ProductReadModel};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// The stream skipped ahead of the cursor; the missing events must be loaded first.
    #[error("sequence gap (last={last}, found={found})")]
    Gap { last: u64, found: u64 },

    #[error("projection lock poisoned")]
    Poisoned,
}

/// Aggregate type tags, shared by writers and the projections that filter on them.
pub mod aggregate_types {
    pub const PRODUCT: &str = "ledger.product";
    pub const EMPLOYEE: &str = "ledger.employee";
}

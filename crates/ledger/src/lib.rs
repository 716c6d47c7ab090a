//! Stock ledger domain (event-sourced).
//!
//! Business rules for uniforms and medications handed out to employees,
//! implemented as deterministic domain logic: no IO, no HTTP, no storage.
//!
//! - [`Product`] is the consistency boundary for stock. Its stream holds the
//!   catalog facts and every [`Movement`] that touched its stock, so current
//!   stock is always the sum of the signed movement quantities.
//! - [`Employee`] is the counterpart of deliveries and returns. Its stream
//!   says whether an employee may still receive goods.

pub mod employee;
pub mod error;
pub mod movement;
pub mod product;
pub mod query;
pub mod report;
pub mod status;

pub use employee::{
    DeactivateEmployee, Employee, EmployeeCommand, EmployeeDeactivated, EmployeeEvent, EmployeeId,
    EmployeeReactivated, EmployeeRegistered, EmployeeStatus, ReactivateEmployee, RegisterEmployee,
};
pub use error::{LedgerError, LedgerResult};
pub use movement::{
    ExitKind, Movement, MovementId, MovementKind, MovementNumber, MovementStamp, Quantity, Signature,
};
pub use product::{
    DeactivateProduct, MovementRecorded, OpeningBalance, Product, ProductCategory, ProductCode,
    ProductCommand, ProductDeactivated, ProductDetailsUpdated, ProductEvent, ProductId,
    ProductReactivated, ProductRegistered, ProductStatus, ReactivateProduct, RecordEntry,
    RecordExit, RegisterProduct, UpdateProductDetails,
};
pub use query::{listing_order, DateRange, MovementFilter, Movements};
pub use report::{
    same_month, DashboardStats, MovementReportRow, ProductLabel, RecentActivity, ReportSummary,
};
pub use status::{StockStatus, StockStatusReport};

//! `stockroom-core`: domain foundation shared by the ledger, auth and infra crates.
//!
//! Pure primitives only: identifiers, the aggregate contract, and the domain
//! error type. Nothing in here performs IO.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, TenantId, UserId};
pub use value_object::ValueObject;

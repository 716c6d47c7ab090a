//! Append-only event store boundary.
//!
//! One trait, two adapters: [`InMemoryEventStore`] for tests and single-process
//! runs, [`PostgresEventStore`] for replicas sharing a database.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

//! Event contracts: the `Event` trait, publication envelopes and the bus.
//!
//! Ledger movements are facts; once a movement event is committed to a product
//! stream it is wrapped in an [`EventEnvelope`] and fanned out on an
//! [`EventBus`] to whoever maintains read models from it.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};

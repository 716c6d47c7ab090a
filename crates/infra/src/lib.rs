//! Infrastructure layer: event store adapters, command dispatch, read models
//! and the stock ledger service built on them.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod locks;
pub mod projections;
pub mod read_model;
pub mod retry;
pub mod stock_ledger;

#[cfg(test)]
mod integration_tests;

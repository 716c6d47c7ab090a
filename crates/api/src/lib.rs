//! HTTP API: server, routing, and request/response mapping.
//!
//! Handlers are thin: they authenticate, authorize against the role policy in
//! `stockroom-auth`, and call the stock ledger. Every stock rule lives in the
//! ledger itself.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;

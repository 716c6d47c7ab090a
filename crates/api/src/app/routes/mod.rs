use axum::{routing::get, Router};

pub mod employees;
pub mod movements;
pub mod products;
pub mod reports;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .nest("/products", products::router())
        .nest("/employees", employees::router())
        .nest("/movements", movements::router())
        .nest("/reports", reports::router())
}

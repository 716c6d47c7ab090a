use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use stockroom_auth::permissions;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/movements", get(movement_rows))
        .route("/summary", get(summary))
        .route("/dashboard", get(dashboard))
}

pub async fn movement_rows(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::MovementParams>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::REPORTS_READ) {
        return errors::authz_error_to_response(e);
    }
    let filter = match params.into_filter() {
        Ok(f) => f,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    match services
        .run(move |ledger| ledger.report_rows(tenant_id, &filter))
        .await
    {
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({ "rows": rows }))).into_response(),
        Err(res) => res,
    }
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::MovementParams>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::REPORTS_READ) {
        return errors::authz_error_to_response(e);
    }
    let filter = match params.into_filter() {
        Ok(f) => f,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    match services
        .run(move |ledger| ledger.report_summary(tenant_id, &filter))
        .await
    {
        Ok(summary) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "summary": summary,
                "net_change": summary.net_change(),
            })),
        )
            .into_response(),
        Err(res) => res,
    }
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::DashboardParams>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::REPORTS_READ) {
        return errors::authz_error_to_response(e);
    }

    let tenant_id = tenant.tenant_id();
    let today = params.today.unwrap_or_else(|| Utc::now().date_naive());
    match services
        .run(move |ledger| ledger.dashboard(tenant_id, today))
        .await
    {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(res) => res,
    }
}

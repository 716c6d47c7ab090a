use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_auth::permissions;
use stockroom_ledger::{EmployeeId, ExitKind, MovementFilter};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_movements))
        .route("/entries", post(record_entry))
        .route("/exits", post(record_exit))
}

pub async fn record_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RecordEntryRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::ENTRIES_CREATE) {
        return errors::authz_error_to_response(e);
    }
    let request = match body.into_entry() {
        Ok(r) => r,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    let actor = principal.actor();
    match services
        .run(move |ledger| ledger.record_entry(tenant_id, actor, request))
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(res) => res,
    }
}

/// Deliveries may be self-service (an employee receiving their own items);
/// returns always need the broader grant.
pub async fn record_exit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RecordExitRequest>,
) -> axum::response::Response {
    // Callers with no exit grant at all are refused before the body is validated.
    if let Err(e) = authz::require(&tenant, &principal, &permissions::EXITS_CREATE)
        .or_else(|_| authz::require(&tenant, &principal, &permissions::OWN_DELIVERIES_CREATE))
    {
        return errors::authz_error_to_response(e);
    }
    let request = match body.into_exit() {
        Ok(r) => r,
        Err(res) => return res,
    };

    let allowed = match request.kind {
        ExitKind::Delivered => authz::require_on_behalf(
            &tenant,
            &principal,
            &permissions::EXITS_CREATE,
            &permissions::OWN_DELIVERIES_CREATE,
            request.employee_id.0,
        ),
        ExitKind::Returned => authz::require(&tenant, &principal, &permissions::EXITS_CREATE),
    };
    if let Err(e) = allowed {
        return errors::authz_error_to_response(e);
    }

    let tenant_id = tenant.tenant_id();
    let actor = principal.actor();
    match services
        .run(move |ledger| ledger.record_exit(tenant_id, actor, request))
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(res) => res,
    }
}

/// Restrict `filter` to what the caller may read: everything, or only the
/// movements of their own employee record.
pub(crate) fn scope_filter(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    mut filter: MovementFilter,
) -> Result<MovementFilter, axum::response::Response> {
    let Err(denied) = authz::require(tenant, principal, &permissions::MOVEMENTS_READ) else {
        return Ok(filter);
    };
    let Some(own) = principal.employee_id() else {
        return Err(errors::authz_error_to_response(denied));
    };

    let target = filter.employee_id.map(|e| e.0).unwrap_or(own);
    authz::require_on_behalf(
        tenant,
        principal,
        &permissions::MOVEMENTS_READ,
        &permissions::OWN_MOVEMENTS_READ,
        target,
    )
    .map_err(errors::authz_error_to_response)?;

    filter.employee_id = Some(EmployeeId::new(target));
    Ok(filter)
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::MovementParams>,
) -> axum::response::Response {
    let filter = match params
        .into_filter()
        .and_then(|f| scope_filter(&tenant, &principal, f))
    {
        Ok(f) => f,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    match services
        .run(move |ledger| ledger.list_movements(tenant_id, &filter))
        .await
    {
        Ok(movements) => {
            (StatusCode::OK, Json(serde_json::json!({ "items": movements }))).into_response()
        }
        Err(res) => res,
    }
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_auth::permissions;
use stockroom_infra::projections::EmployeeQuery;
use stockroom_ledger::EmployeeId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_employee).get(list_employees))
        .route("/:id", get(get_employee))
        .route("/:id/deactivate", post(deactivate_employee))
        .route("/:id/reactivate", post(reactivate_employee))
}

pub async fn register_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RegisterEmployeeRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::EMPLOYEES_MANAGE) {
        return errors::authz_error_to_response(e);
    }

    let tenant_id = tenant.tenant_id();
    match services
        .run(move |ledger| ledger.register_employee(tenant_id, body.into()))
        .await
    {
        Ok(employee) => (StatusCode::CREATED, Json(employee)).into_response(),
        Err(res) => res,
    }
}

async fn set_active(
    services: Arc<AppServices>,
    tenant: TenantContext,
    principal: PrincipalContext,
    id: String,
    active: bool,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::EMPLOYEES_MANAGE) {
        return errors::authz_error_to_response(e);
    }
    let employee_id = match dto::parse_id(&id, "employee") {
        Ok(v) => EmployeeId::new(v),
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    match services
        .run(move |ledger| ledger.set_employee_active(tenant_id, employee_id, active))
        .await
    {
        Ok(employee) => (StatusCode::OK, Json(employee)).into_response(),
        Err(res) => res,
    }
}

pub async fn deactivate_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    set_active(services, tenant, principal, id, false).await
}

pub async fn reactivate_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    set_active(services, tenant, principal, id, true).await
}

pub async fn get_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let employee_id = match dto::parse_id(&id, "employee") {
        Ok(v) => v,
        Err(res) => return res,
    };
    // Employees may look themselves up.
    if let Err(e) = authz::require_on_behalf(
        &tenant,
        &principal,
        &permissions::EMPLOYEES_READ,
        &permissions::OWN_MOVEMENTS_READ,
        employee_id,
    ) {
        return errors::authz_error_to_response(e);
    }

    match services.ledger().get_employee(tenant.tenant_id(), EmployeeId::new(employee_id)) {
        Ok(rm) => (StatusCode::OK, Json(rm)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::EmployeeListParams>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::EMPLOYEES_READ) {
        return errors::authz_error_to_response(e);
    }

    let query: EmployeeQuery = params.into();
    let items = services.ledger().list_employees(tenant.tenant_id(), &query);
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

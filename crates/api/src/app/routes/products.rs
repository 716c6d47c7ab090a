use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_auth::permissions;
use stockroom_ledger::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_product).patch(update_product))
        .route("/:id/stock", get(stock_status))
        .route("/:id/deactivate", post(deactivate_product))
        .route("/:id/reactivate", post(reactivate_product))
}

fn product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    dto::parse_id(raw, "product").map(ProductId::new)
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::PRODUCTS_MANAGE) {
        return errors::authz_error_to_response(e);
    }
    let request = match body.into_new_product() {
        Ok(r) => r,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    let actor = principal.actor();
    match services
        .run(move |ledger| ledger.register_product(tenant_id, actor, request))
        .await
    {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(res) => res,
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::PRODUCTS_MANAGE) {
        return errors::authz_error_to_response(e);
    }
    let product_id = match product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    let actor = principal.actor();
    match services
        .run(move |ledger| ledger.update_product(tenant_id, actor, product_id, body.into()))
        .await
    {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
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
    if let Err(e) = authz::require(&tenant, &principal, &permissions::PRODUCTS_MANAGE) {
        return errors::authz_error_to_response(e);
    }
    let product_id = match product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    let actor = principal.actor();
    match services
        .run(move |ledger| ledger.set_product_active(tenant_id, actor, product_id, active))
        .await
    {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(res) => res,
    }
}

pub async fn deactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    set_active(services, tenant, principal, id, false).await
}

pub async fn reactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    set_active(services, tenant, principal, id, true).await
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::PRODUCTS_READ) {
        return errors::authz_error_to_response(e);
    }
    let product_id = match product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.ledger().get_product(tenant.tenant_id(), product_id) {
        Ok(rm) => (StatusCode::OK, Json(rm)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<dto::ProductListParams>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::PRODUCTS_READ) {
        return errors::authz_error_to_response(e);
    }
    let query = match params.into_query() {
        Ok(q) => q,
        Err(res) => return res,
    };

    let items = services.ledger().list_products(tenant.tenant_id(), &query);
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::PRODUCTS_READ) {
        return errors::authz_error_to_response(e);
    }
    let items = services.ledger().low_stock(tenant.tenant_id());
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// Stock level read from the committed stream, not the catalog projection.
pub async fn stock_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&tenant, &principal, &permissions::PRODUCTS_READ) {
        return errors::authz_error_to_response(e);
    }
    let product_id = match product_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let tenant_id = tenant.tenant_id();
    match services
        .run(move |ledger| ledger.get_stock_status(tenant_id, product_id))
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(res) => res,
    }
}

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use stockroom_api::config::ApiConfig;
use stockroom_auth::{JwtClaims, PrincipalId, Role};
use stockroom_core::{AggregateId, TenantId};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let app = stockroom_api::app::build_app(ApiConfig::in_memory(SECRET))
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(tenant_id: TenantId, role: &'static str, employee_id: Option<AggregateId>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        tenant_id,
        roles: vec![Role::new(role)],
        employee_id,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn post(client: &reqwest::Client, url: String, token: &str, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).bearer_auth(token).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

async fn get(client: &reqwest::Client, url: String, token: &str) -> (StatusCode, Value) {
    let res = client.get(url).bearer_auth(token).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

/// Admin token plus a product (stock 10, minimum 5) and an employee.
async fn seed(srv: &TestServer, client: &reqwest::Client, tenant_id: TenantId) -> (String, String, String) {
    let admin = mint_jwt(tenant_id, Role::ADMIN, None);

    let (status, product) = post(
        client,
        srv.url("/products"),
        &admin,
        json!({
            "code": "cam-m",
            "name": "Camisa M",
            "category": "uniform",
            "unit": "pcs",
            "minimum_stock": 5,
            "opening_stock": 10,
            "opening_date": "2024-03-01",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    assert_eq!(product["code"], "CAM-M");

    let (status, employee) = post(
        client,
        srv.url("/employees"),
        &admin,
        json!({ "name": "Juan Pérez", "area": "Logistics", "position": "Driver" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{employee}");

    (
        admin,
        product["product_id"].as_str().unwrap().to_string(),
        employee["employee_id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_is_public_and_domain_routes_need_a_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/products"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenant_context_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let token = mint_jwt(tenant_id, Role::AUDITOR, None);

    let (status, body) = get(&client, srv.url("/whoami"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant_id"].as_str().unwrap(), tenant_id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "auditor"));
}

#[tokio::test]
async fn camisa_m_scenario_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let (admin, product_id, employee_id) = seed(&srv, &client, tenant_id).await;

    let (status, entry) = post(
        &client,
        srv.url("/movements/entries"),
        &admin,
        json!({
            "product_id": product_id,
            "quantity": 5,
            "supplier": "Textil SA",
            "effective_date": "2024-03-05",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert!(entry["number"].as_str().unwrap().starts_with("ENT-20240305-"));

    let (_, stock) = get(&client, srv.url(&format!("/products/{product_id}/stock")), &admin).await;
    assert_eq!(stock["level"], 15);
    assert_eq!(stock["status"], "normal");

    let delivery = |quantity: i64, signature: Option<&str>| {
        json!({
            "product_id": product_id,
            "employee_id": employee_id,
            "quantity": quantity,
            "kind": "delivered",
            "effective_date": "2024-03-06",
            "signature": signature,
        })
    };

    let (status, body) = post(&client, srv.url("/movements/exits"), &admin, delivery(12, Some("Juan Pérez"))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, stock) = get(&client, srv.url(&format!("/products/{product_id}/stock")), &admin).await;
    assert_eq!(stock["level"], 3);
    assert_eq!(stock["status"], "low_stock");

    let (status, body) = post(&client, srv.url("/movements/exits"), &admin, delivery(5, Some("Juan Pérez"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_stock");

    let (status, body) = post(&client, srv.url("/movements/exits"), &admin, delivery(1, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "missing_signature");

    let (status, _) = post(&client, srv.url("/movements/exits"), &admin, delivery(0, Some("x"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stock) = get(&client, srv.url(&format!("/products/{product_id}/stock")), &admin).await;
    assert_eq!(stock["level"], 3);

    let (status, listed) = get(&client, srv.url("/movements"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<_> = listed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["delivered", "entry", "entry"]);

    let (status, low) = get(&client, srv.url("/products/low-stock"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_targets_and_duplicates_map_to_http_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let (admin, product_id, _) = seed(&srv, &client, tenant_id).await;

    let (status, body) = post(
        &client,
        srv.url("/movements/exits"),
        &admin,
        json!({
            "product_id": product_id,
            "employee_id": AggregateId::new().to_string(),
            "quantity": 1,
            "kind": "delivered",
            "effective_date": "2024-03-06",
            "signature": "someone",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_employee");

    let (status, _) = get(&client, srv.url(&format!("/products/{}", AggregateId::new())), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&client, srv.url("/products/not-an-id"), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &client,
        srv.url("/products"),
        &admin,
        json!({ "code": "CAM-M", "name": "Again", "category": "uniform", "unit": "pcs" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_product_code");
}

#[tokio::test]
async fn roles_are_enforced() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let (_, product_id, employee_id) = seed(&srv, &client, tenant_id).await;

    let entry = json!({
        "product_id": product_id,
        "quantity": 1,
        "supplier": "Textil SA",
        "effective_date": "2024-03-05",
    });

    let auditor = mint_jwt(tenant_id, Role::AUDITOR, None);
    let (status, _) = post(&client, srv.url("/movements/entries"), &auditor, entry.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get(&client, srv.url("/reports/summary"), &auditor).await;
    assert_eq!(status, StatusCode::OK);

    // Refused before the body is looked at.
    let (status, _) = post(
        &client,
        srv.url("/movements/exits"),
        &auditor,
        json!({
            "product_id": "not-an-id",
            "employee_id": employee_id,
            "quantity": 1,
            "kind": "stolen",
            "effective_date": "2024-03-06",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let manager = mint_jwt(tenant_id, Role::DELIVERY_MANAGER, None);
    let (status, _) = post(&client, srv.url("/movements/entries"), &manager, entry).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(
        &client,
        srv.url("/products"),
        &manager,
        json!({ "code": "X-1", "name": "X", "category": "medication", "unit": "box" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An employee can sign for their own delivery but not for a colleague's.
    let own: AggregateId = employee_id.parse().unwrap();
    let employee = mint_jwt(tenant_id, Role::EMPLOYEE, Some(own));
    let delivery = |employee_id: String| {
        json!({
            "product_id": product_id,
            "employee_id": employee_id,
            "quantity": 1,
            "kind": "delivered",
            "effective_date": "2024-03-06",
            "signature": "Juan Pérez",
        })
    };
    let (status, _) = post(&client, srv.url("/movements/exits"), &employee, delivery(employee_id.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(
        &client,
        srv.url("/movements/exits"),
        &employee,
        delivery(AggregateId::new().to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Their movement listing is scoped to themselves.
    let (status, listed) = get(&client, srv.url("/movements"), &employee).await;
    assert_eq!(status, StatusCode::OK);
    let items = listed["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["employee_id"].as_str().unwrap(), employee_id);

    let (status, _) = get(&client, srv.url("/reports/dashboard"), &employee).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reports_and_dashboard_reflect_movements() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant_id = TenantId::new();
    let (admin, product_id, employee_id) = seed(&srv, &client, tenant_id).await;

    let (status, _) = post(
        &client,
        srv.url("/movements/exits"),
        &admin,
        json!({
            "product_id": product_id,
            "employee_id": employee_id,
            "quantity": 6,
            "kind": "delivered",
            "effective_date": "2024-03-06",
            "signature": "Juan Pérez",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, rows) = get(&client, srv.url("/reports/movements?kind=delivered"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["product_code"], "CAM-M");
    assert_eq!(rows[0]["employee_name"], "Juan Pérez");
    assert_eq!(rows[0]["signature"], "Juan Pérez");

    let (_, summary) = get(&client, srv.url("/reports/summary"), &admin).await;
    assert_eq!(summary["summary"]["quantity_in"], 10);
    assert_eq!(summary["summary"]["quantity_out"], 6);
    assert_eq!(summary["net_change"], 4);

    let (status, stats) = get(&client, srv.url("/reports/dashboard?today=2024-03-20"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_stock"], 4);
    assert_eq!(stats["entries_this_month"], 1);
    assert_eq!(stats["deliveries_this_month"], 1);
    assert_eq!(stats["low_stock_alerts"], 1);
    assert_eq!(stats["recent_activity"].as_array().unwrap().len(), 2);

    let (status, _) = get(&client, srv.url("/reports/summary?from=2024-03-31&to=2024-03-01"), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tenants_are_isolated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, product_id, _) = seed(&srv, &client, TenantId::new()).await;

    let other = mint_jwt(TenantId::new(), Role::ADMIN, None);
    let (status, _) = get(&client, srv.url(&format!("/products/{product_id}")), &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&client, srv.url(&format!("/products/{product_id}/stock")), &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = get(&client, srv.url("/products"), &other).await;
    assert!(listed["items"].as_array().unwrap().is_empty());
}

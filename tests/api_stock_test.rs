mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::*;
use serde_json::{json, Value};
use sitestock_api::{
    auth::Role,
    config::AppConfig,
    AppState,
};
use tower::util::ServiceExt;
use uuid::Uuid;

const TEST_SECRET: &str = "integration_test_secret_that_is_long_enough_123456";

async fn test_app() -> (Router, AppState) {
    let db = setup_db().await;
    let cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        TEST_SECRET.to_string(),
        "127.0.0.1".to_string(),
        0,
    );
    let state = AppState::build(db, cfg, event_sender());
    let app = sitestock_api::app_router(state.clone());
    (app, state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

#[tokio::test]
async fn status_endpoint_is_open() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "GET", "/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "sitestock-api");
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let (app, state) = test_app().await;

    let (status, _) = send(&app, "GET", "/api/v1/stock/levels", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/stock/levels",
        Some("not-a-real-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = state
        .auth
        .issue_token(Uuid::new_v4(), Role::User)
        .expect("token");
    let (status, _) = send(&app, "GET", "/api/v1/stock/levels", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stock_flow_over_http() {
    let (app, state) = test_app().await;
    let token = state
        .auth
        .issue_token(Uuid::new_v4(), Role::User)
        .expect("token");

    let material = create_test_material(&state.db, "Cement 25kg").await;
    let warehouse = create_test_warehouse(&state.db, "Main Yard").await;

    // Register initial stock
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/stock/levels",
        Some(&token),
        Some(json!({
            "material_id": material.id,
            "warehouse_id": warehouse.id,
            "current_stock": 3,
            "safety_stock": 5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["current_stock"], 3);
    assert_eq!(body["data"]["is_low_stock"], true);
    assert_eq!(body["data"]["shortage"], 2);
    let level_id = body["data"]["id"].as_str().unwrap().to_string();

    // Duplicate registration conflicts
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/stock/levels",
        Some(&token),
        Some(json!({
            "material_id": material.id,
            "warehouse_id": warehouse.id,
            "current_stock": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Receive ten more
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/stock/movements",
        Some(&token),
        Some(json!({
            "type": "IN",
            "material_id": material.id,
            "warehouse_id": warehouse.id,
            "quantity": 10,
            "unit_price": "5.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["stock_level"]["current_stock"], 13);
    assert_eq!(body["data"]["transaction"]["quantity"], 10);

    // Overdraw is rejected with 422
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/stock/movements",
        Some(&token),
        Some(json!({
            "type": "OUT",
            "material_id": material.id,
            "warehouse_id": warehouse.id,
            "quantity": 99
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Insufficient stock"));

    // Manual correction via PUT
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/stock/levels/{}", level_id),
        Some(&token),
        Some(json!({ "current_stock": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_stock"], 100);

    // Movement listing shows exactly the one recorded transaction
    let (status, body) = send(&app, "GET", "/api/v1/stock/movements", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    // Report grouped by material
    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/stock/movements/report?group_by=material",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["in_quantity"], 10);
}

#[tokio::test]
async fn movement_validation_over_http() {
    let (app, state) = test_app().await;
    let token = state
        .auth
        .issue_token(Uuid::new_v4(), Role::User)
        .expect("token");

    let material = create_test_material(&state.db, "Sand").await;
    let warehouse = create_test_warehouse(&state.db, "Depot").await;

    // Zero quantity fails validation
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/stock/movements",
        Some(&token),
        Some(json!({
            "type": "IN",
            "material_id": material.id,
            "warehouse_id": warehouse.id,
            "quantity": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown material is a 404
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/stock/movements",
        Some(&token),
        Some(json!({
            "type": "IN",
            "material_id": Uuid::new_v4(),
            "warehouse_id": warehouse.id,
            "quantity": 5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deletes_are_admin_only() {
    let (app, state) = test_app().await;
    let user_token = state
        .auth
        .issue_token(Uuid::new_v4(), Role::User)
        .expect("token");
    let admin_token = state
        .auth
        .issue_token(Uuid::new_v4(), Role::Admin)
        .expect("token");

    let material = create_test_material(&state.db, "Primer").await;
    let warehouse = create_test_warehouse(&state.db, "Depot").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/stock/levels",
        Some(&user_token),
        Some(json!({
            "material_id": material.id,
            "warehouse_id": warehouse.id,
            "current_stock": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let level_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/stock/levels/{}", level_id),
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/stock/levels/{}", level_id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn catalog_codes_are_unique_over_http() {
    let (app, state) = test_app().await;
    let token = state
        .auth
        .issue_token(Uuid::new_v4(), Role::User)
        .expect("token");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/warehouses",
        Some(&token),
        Some(json!({ "code": "WH-MAIN", "name": "Main" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/warehouses",
        Some(&token),
        Some(json!({ "code": "WH-MAIN", "name": "Duplicate" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

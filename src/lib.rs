//! Sitestock API Library
//!
//! Construction-materials inventory control: per-(material, warehouse) stock
//! levels, an append-only movement ledger and read-side reporting.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod queries;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub stock_service: services::stock::StockService,
    pub material_service: services::catalog::MaterialService,
    pub warehouse_service: services::catalog::WarehouseService,
    pub supplier_service: services::catalog::SupplierService,
    pub project_service: services::catalog::ProjectService,
    pub auth: Arc<auth::AuthVerifier>,
}

impl AppState {
    /// Builds the full application state from a connected pool and config.
    pub fn build(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let auth = Arc::new(auth::AuthVerifier::new(
            &config.jwt_secret,
            std::time::Duration::from_secs(config.jwt_expiration_secs),
        ));

        Self {
            stock_service: services::stock::StockService::new(
                db.clone(),
                event_sender.clone(),
                config.movement_retry_attempts,
            ),
            material_service: services::catalog::MaterialService::new(db.clone()),
            warehouse_service: services::catalog::WarehouseService::new(db.clone()),
            supplier_service: services::catalog::SupplierService::new(db.clone()),
            project_service: services::catalog::ProjectService::new(db.clone()),
            auth,
            db,
            config,
            event_sender,
        }
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes under /api/v1. All of them sit behind the bearer-token middleware
/// applied by [`app_router`].
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/stock/levels", handlers::stock_levels::routes())
        .nest("/stock/movements", handlers::movements::routes())
        .nest("/materials", handlers::catalog::material_routes())
        .nest("/warehouses", handlers::catalog::warehouse_routes())
        .nest("/suppliers", handlers::catalog::supplier_routes())
        .nest("/projects", handlers::catalog::project_routes())
}

/// Assembles the complete application router: open status/health endpoints,
/// the protected v1 API, Swagger UI and the HTTP middleware stack.
pub fn app_router(state: AppState) -> Router {
    let protected = api_v1_routes().route_layer(axum::middleware::from_fn_with_state(
        state.auth.clone(),
        auth::require_auth,
    ));

    Router::new()
        .route("/", get(|| async { "sitestock-api up" }))
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/api/v1", protected)
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "sitestock-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

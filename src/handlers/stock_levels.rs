use crate::{
    auth::AuthenticatedUser,
    entities::stock_level,
    errors::ServiceError,
    queries::stock_queries::{ListStockLevelsQuery, Query, StockSort},
    services::stock::{AdjustStockCommand, RegisterStockCommand},
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query as UrlQuery, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Stock level enriched with the derived reads, recomputed on every response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockLevelView {
    #[serde(flatten)]
    pub level: stock_level::Model,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
    pub stock_value: Decimal,
    pub shortage: i32,
}

impl From<stock_level::Model> for StockLevelView {
    fn from(level: stock_level::Model) -> Self {
        Self {
            is_low_stock: level.is_low_stock(),
            is_out_of_stock: level.is_out_of_stock(),
            stock_value: level.stock_value(),
            shortage: level.shortage(),
            level,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterStockRequest {
    pub material_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(range(min = 0))]
    pub current_stock: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub safety_stock: i32,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    #[validate(range(min = 0))]
    pub current_stock: Option<i32>,
    #[validate(range(min = 0))]
    pub safety_stock: Option<i32>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StockLevelFilters {
    pub material_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub material_base_id: Option<Uuid>,
    pub low_stock: Option<bool>,
    pub sort: Option<StockSort>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stock_levels).post(register_stock))
        .route("/low", get(list_low_stock))
        .route(
            "/:id",
            get(get_stock_level)
                .put(adjust_stock)
                .delete(delete_stock_level),
        )
}

/// List stock levels with optional filtering
#[utoipa::path(
    get,
    path = "/api/v1/stock/levels",
    params(StockLevelFilters),
    responses(
        (status = 200, description = "Stock levels returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn list_stock_levels(
    State(state): State<AppState>,
    UrlQuery(filters): UrlQuery<StockLevelFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(50).clamp(1, 500);

    let (items, total) = ListStockLevelsQuery {
        material_id: filters.material_id,
        warehouse_id: filters.warehouse_id,
        material_base_id: filters.material_base_id,
        low_stock_only: filters.low_stock.unwrap_or(false),
        sort: filters.sort.unwrap_or_default(),
        page,
        limit,
    }
    .execute(&state.db)
    .await?;

    let views: Vec<StockLevelView> = items.into_iter().map(StockLevelView::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        views, total, page, limit,
    ))))
}

/// List stock levels at or below their safety stock
#[utoipa::path(
    get,
    path = "/api/v1/stock/levels/low",
    responses(
        (status = 200, description = "Low stock levels returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    UrlQuery(filters): UrlQuery<StockLevelFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(50).clamp(1, 500);

    let (items, total) = ListStockLevelsQuery {
        material_id: filters.material_id,
        warehouse_id: filters.warehouse_id,
        material_base_id: filters.material_base_id,
        low_stock_only: true,
        sort: StockSort::CurrentStock,
        page,
        limit,
    }
    .execute(&state.db)
    .await?;

    let views: Vec<StockLevelView> = items.into_iter().map(StockLevelView::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        views, total, page, limit,
    ))))
}

/// Register the initial stock for a (material, warehouse) pair
#[utoipa::path(
    post,
    path = "/api/v1/stock/levels",
    request_body = RegisterStockRequest,
    responses(
        (status = 201, description = "Stock level registered", body = StockLevelView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material or warehouse not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Pair already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn register_stock(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RegisterStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let level = state
        .stock_service
        .register_initial_stock(RegisterStockCommand {
            material_id: payload.material_id,
            warehouse_id: payload.warehouse_id,
            current_stock: payload.current_stock,
            safety_stock: payload.safety_stock,
            unit_price: payload.unit_price,
            user_id: user.id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(StockLevelView::from(level))),
    ))
}

/// Get one stock level
#[utoipa::path(
    get,
    path = "/api/v1/stock/levels/{id}",
    params(("id" = Uuid, Path, description = "Stock level ID")),
    responses(
        (status = 200, description = "Stock level returned", body = StockLevelView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_stock_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let level = state.stock_service.get_stock_level(id).await?;

    Ok(Json(ApiResponse::success(StockLevelView::from(level))))
}

/// Manually correct a stock level (physical recount)
///
/// This bypasses the movement ledger by design; no transaction row is
/// written and the correction is tagged separately in the audit stream.
#[utoipa::path(
    put,
    path = "/api/v1/stock/levels/{id}",
    params(("id" = Uuid, Path, description = "Stock level ID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock level adjusted", body = StockLevelView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let level = state
        .stock_service
        .adjust_stock(
            id,
            AdjustStockCommand {
                current_stock: payload.current_stock,
                safety_stock: payload.safety_stock,
                unit_price: payload.unit_price,
                user_id: user.id,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(StockLevelView::from(level))))
}

/// Delete a stock level (admin only, blocked while transactions reference it)
pub async fn delete_stock_level(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;

    state.stock_service.delete_stock_level(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted_id": id
    }))))
}

use crate::{
    auth::AuthenticatedUser,
    entities::stock_transaction::MovementType,
    errors::ServiceError,
    handlers::stock_levels::StockLevelView,
    queries::stock_queries::{
        ListMovementsQuery, MovementFilter, MovementReportQuery, Query, ReportGroupBy,
    },
    services::stock::RecordMovementCommand,
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Query as UrlQuery, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordMovementRequest {
    /// Movement direction: "IN" or "OUT"
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub material_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    /// Supplier attribution, used for IN movements
    pub supplier_id: Option<Uuid>,
    /// Project attribution, used for OUT movements
    pub project_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementFilters {
    pub material_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl MovementFilters {
    fn into_filter(self) -> MovementFilter {
        MovementFilter {
            material_id: self.material_id,
            warehouse_id: self.warehouse_id,
            supplier_id: self.supplier_id,
            project_id: self.project_id,
            movement_type: self.movement_type,
            from: self.from,
            to: self.to,
            search: self.search,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportParams {
    pub group_by: ReportGroupBy,
    pub material_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementOutcomeView {
    pub transaction: crate::entities::stock_transaction::Model,
    pub stock_level: StockLevelView,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movements).post(record_movement))
        .route("/report", get(movement_report))
}

/// Record one IN or OUT stock movement
#[utoipa::path(
    post,
    path = "/api/v1/stock/movements",
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded", body = MovementOutcomeView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material or warehouse not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let outcome = state
        .stock_service
        .record_movement(RecordMovementCommand {
            movement_type: payload.movement_type,
            material_id: payload.material_id,
            warehouse_id: payload.warehouse_id,
            quantity: payload.quantity,
            unit_price: payload.unit_price,
            supplier_id: payload.supplier_id,
            project_id: payload.project_id,
            notes: payload.notes,
            user_id: user.id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MovementOutcomeView {
            transaction: outcome.transaction,
            stock_level: StockLevelView::from(outcome.stock_level),
        })),
    ))
}

/// List ledger transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/stock/movements",
    params(MovementFilters),
    responses(
        (status = 200, description = "Transactions returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    UrlQuery(filters): UrlQuery<MovementFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(50).clamp(1, 500);

    let (items, total) = ListMovementsQuery {
        filter: filters.into_filter(),
        page,
        limit,
    }
    .execute(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Aggregate ledger transactions by date bucket or entity
#[utoipa::path(
    get,
    path = "/api/v1/stock/movements/report",
    params(ReportParams),
    responses(
        (status = 200, description = "Report returned"),
        (status = 400, description = "Invalid grouping", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn movement_report(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<ReportParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = MovementReportQuery {
        group_by: params.group_by,
        filter: MovementFilter {
            material_id: params.material_id,
            warehouse_id: params.warehouse_id,
            supplier_id: params.supplier_id,
            project_id: params.project_id,
            from: params.from,
            to: params.to,
            ..Default::default()
        },
    }
    .execute(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(report)))
}

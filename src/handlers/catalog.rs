use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    services::catalog::{
        CreateMaterialCommand, CreateWarehouseCommand, UpdateMaterialCommand,
        UpdateWarehouseCommand,
    },
    ApiResponse, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query as UrlQuery, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Materials

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialRequest {
    pub material_base_id: Uuid,
    pub color_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub name: String,
    pub finish: Option<String>,
    #[validate(length(min = 1))]
    pub unit: String,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMaterialRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route(
            "/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
}

pub async fn create_material(
    State(state): State<AppState>,
    Json(payload): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let material = state
        .material_service
        .create(CreateMaterialCommand {
            material_base_id: payload.material_base_id,
            color_id: payload.color_id,
            name: payload.name,
            finish: payload.finish,
            unit: payload.unit,
            description: payload.description,
            unit_price: payload.unit_price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(material))))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let material = state.material_service.get(id).await?;
    Ok(Json(ApiResponse::success(material)))
}

pub async fn list_materials(
    State(state): State<AppState>,
    UrlQuery(query): UrlQuery<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .material_service
        .list(query.search.clone(), query.page, query.limit)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    ))))
}

pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMaterialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let material = state
        .material_service
        .update(
            id,
            UpdateMaterialCommand {
                name: payload.name,
                description: payload.description,
                unit_price: payload.unit_price,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(material)))
}

pub async fn delete_material(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.material_service.delete(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted_id": id
    }))))
}

// Warehouses

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub location: Option<String>,
    pub purpose: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehouseRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub is_active: Option<bool>,
}

pub fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route(
            "/:id",
            get(get_warehouse)
                .put(update_warehouse)
                .delete(delete_warehouse),
        )
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let warehouse = state
        .warehouse_service
        .create(CreateWarehouseCommand {
            code: payload.code,
            name: payload.name,
            location: payload.location,
            purpose: payload.purpose,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(warehouse))))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let warehouse = state.warehouse_service.get(id).await?;
    Ok(Json(ApiResponse::success(warehouse)))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    UrlQuery(query): UrlQuery<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .warehouse_service
        .list(query.search.clone(), query.page, query.limit)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    ))))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWarehouseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let warehouse = state
        .warehouse_service
        .update(
            id,
            UpdateWarehouseCommand {
                name: payload.name,
                location: payload.location,
                purpose: payload.purpose,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(warehouse)))
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.warehouse_service.delete(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted_id": id
    }))))
}

// Suppliers

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub phone: Option<String>,
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/:id", get(get_supplier).delete(delete_supplier))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let supplier = state
        .supplier_service
        .create(
            payload.code,
            payload.name,
            payload.contact_email,
            payload.phone,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(supplier))))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.supplier_service.get(id).await?;
    Ok(Json(ApiResponse::success(supplier)))
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    UrlQuery(query): UrlQuery<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .supplier_service
        .list(query.page, query.limit)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    ))))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.supplier_service.delete(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted_id": id
    }))))
}

// Projects

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub name: String,
}

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project).delete(delete_project))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let project = state
        .project_service
        .create(payload.code, payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state.project_service.get(id).await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    UrlQuery(query): UrlQuery<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state.project_service.list(query.page, query.limit).await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.limit,
    ))))
}

pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.project_service.delete(id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted_id": id
    }))))
}

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "sitestock-api",
        description = "Construction-materials inventory ledger: stock levels, an append-only movement ledger and movement reporting",
        license(name = "MIT")
    ),
    paths(
        crate::handlers::stock_levels::list_stock_levels,
        crate::handlers::stock_levels::list_low_stock,
        crate::handlers::stock_levels::register_stock,
        crate::handlers::stock_levels::get_stock_level,
        crate::handlers::stock_levels::adjust_stock,
        crate::handlers::movements::record_movement,
        crate::handlers::movements::list_movements,
        crate::handlers::movements::movement_report,
    ),
    components(schemas(
        crate::entities::material::Model,
        crate::entities::warehouse::Model,
        crate::entities::supplier::Model,
        crate::entities::project::Model,
        crate::entities::stock_level::Model,
        crate::entities::stock_transaction::Model,
        crate::entities::stock_transaction::MovementType,
        crate::handlers::stock_levels::StockLevelView,
        crate::handlers::stock_levels::RegisterStockRequest,
        crate::handlers::stock_levels::AdjustStockRequest,
        crate::handlers::movements::RecordMovementRequest,
        crate::handlers::movements::MovementOutcomeView,
        crate::queries::stock_queries::ReportBucket,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "stock", description = "Stock level registration, correction and search"),
        (name = "movements", description = "The append-only movement ledger and its reports")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs, serving the generated document at
/// /api-docs/openapi.json.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

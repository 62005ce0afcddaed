#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database, DatabaseConnection, IntoActiveModel};
use sea_orm::ActiveModelTrait;
use sitestock_api::{
    db,
    entities::{material, project, supplier, warehouse},
    events::{process_events, EventSender},
    services::{
        catalog::{MaterialService, ProjectService, SupplierService, WarehouseService},
        stock::StockService,
    },
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Connects an in-memory SQLite database and applies the embedded
/// migrations. A single connection keeps the database alive and shared for
/// the whole test.
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).sqlx_logging(false);

    let pool = Database::connect(opt).await.expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    Arc::new(pool)
}

pub fn event_sender() -> EventSender {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(process_events(rx));
    EventSender::new(tx)
}

pub fn stock_service(db: Arc<DatabaseConnection>) -> StockService {
    StockService::new(db, event_sender(), 3)
}

pub fn material_service(db: Arc<DatabaseConnection>) -> MaterialService {
    MaterialService::new(db)
}

pub fn warehouse_service(db: Arc<DatabaseConnection>) -> WarehouseService {
    WarehouseService::new(db)
}

pub fn supplier_service(db: Arc<DatabaseConnection>) -> SupplierService {
    SupplierService::new(db)
}

pub fn project_service(db: Arc<DatabaseConnection>) -> ProjectService {
    ProjectService::new(db)
}

pub async fn create_test_material(db: &DatabaseConnection, name: &str) -> material::Model {
    material::Model::new(
        Uuid::new_v4(),
        None,
        name.to_string(),
        None,
        "pcs".to_string(),
        None,
    )
    .into_active_model()
    .insert(db)
    .await
    .expect("create material")
}

pub async fn create_test_warehouse(db: &DatabaseConnection, name: &str) -> warehouse::Model {
    warehouse::Model::new(format!("WH-{}", Uuid::new_v4()), name.to_string(), None)
        .into_active_model()
        .insert(db)
        .await
        .expect("create warehouse")
}

pub async fn create_test_supplier(db: &DatabaseConnection, name: &str) -> supplier::Model {
    supplier::Model::new(format!("SUP-{}", Uuid::new_v4()), name.to_string())
        .into_active_model()
        .insert(db)
        .await
        .expect("create supplier")
}

pub async fn create_test_project(db: &DatabaseConnection, name: &str) -> project::Model {
    project::Model::new(format!("PRJ-{}", Uuid::new_v4()), name.to_string())
        .into_active_model()
        .insert(db)
        .await
        .expect("create project")
}

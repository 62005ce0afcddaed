use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Warehouse entity model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = Warehouse)]
#[sea_orm(table_name = "warehouses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    /// Human-facing code, unique across warehouses.
    #[sea_orm(unique)]
    pub code: String,

    pub name: String,

    pub location: Option<String>,

    pub purpose: Option<String>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::entities::stock_level::Entity")]
    StockLevels,

    #[sea_orm(has_many = "crate::entities::stock_transaction::Entity")]
    StockTransactions,
}

impl Related<crate::entities::stock_level::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockLevels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a new warehouse.
    pub fn new(code: String, name: String, location: Option<String>) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            code,
            name,
            location,
            purpose: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

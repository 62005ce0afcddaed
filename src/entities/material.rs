use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Material entity model.
///
/// A material is a concrete stockable variant of a base material:
/// base + optional color + finish. `material_base_id` and `color_id` are
/// reference fields fixed at creation; price, description and active flag
/// are business fields that may change.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = Material)]
#[sea_orm(table_name = "materials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub material_base_id: Uuid,

    pub color_id: Option<Uuid>,

    pub name: String,

    pub finish: Option<String>,

    pub unit: String,

    pub description: Option<String>,

    pub unit_price: Option<Decimal>,

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
    /// Creates a new material instance.
    pub fn new(
        material_base_id: Uuid,
        color_id: Option<Uuid>,
        name: String,
        finish: Option<String>,
        unit: String,
        unit_price: Option<Decimal>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            material_base_id,
            color_id,
            name,
            finish,
            unit,
            description: None,
            unit_price,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Movement direction: receipt into a warehouse or issue out of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum MovementType {
    #[sea_orm(string_value = "IN")]
    #[serde(rename = "IN")]
    In,

    #[sea_orm(string_value = "OUT")]
    #[serde(rename = "OUT")]
    Out,
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementType::In => write!(f, "IN"),
            MovementType::Out => write!(f, "OUT"),
        }
    }
}

impl MovementType {
    /// Sign applied to the quantity when accumulating a running balance.
    pub fn signum(&self) -> i32 {
        match self {
            MovementType::In => 1,
            MovementType::Out => -1,
        }
    }
}

/// Stock transaction entity model.
///
/// One immutable row per inventory movement. Rows are appended by the ledger
/// and never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = StockTransaction)]
#[sea_orm(table_name = "stock_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    pub movement_type: MovementType,

    #[sea_orm(column_type = "Uuid")]
    pub material_id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub warehouse_id: Uuid,

    pub quantity: i32,

    pub unit_price: Option<Decimal>,

    pub total_price: Option<Decimal>,

    pub supplier_id: Option<Uuid>,

    pub project_id: Option<Uuid>,

    #[sea_orm(column_type = "Uuid")]
    pub user_id: Uuid,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::material::Entity",
        from = "Column::MaterialId",
        to = "crate::entities::material::Column::Id"
    )]
    Material,

    #[sea_orm(
        belongs_to = "crate::entities::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "crate::entities::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<crate::entities::material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl Related<crate::entities::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a new stock transaction. `total_price` is derived from the
    /// unit price when one is supplied.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        movement_type: MovementType,
        material_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        unit_price: Option<Decimal>,
        supplier_id: Option<Uuid>,
        project_id: Option<Uuid>,
        user_id: Uuid,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            movement_type,
            material_id,
            warehouse_id,
            quantity,
            unit_price,
            total_price: unit_price.map(|p| p * Decimal::from(quantity)),
            supplier_id,
            project_id,
            user_id,
            notes,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_price_derived_from_unit_price() {
        let txn = Model::new(
            MovementType::In,
            Uuid::new_v4(),
            Uuid::new_v4(),
            10,
            Some(dec!(5.00)),
            None,
            None,
            Uuid::new_v4(),
            None,
        );
        assert_eq!(txn.total_price, Some(dec!(50.00)));

        let txn = Model::new(
            MovementType::Out,
            Uuid::new_v4(),
            Uuid::new_v4(),
            10,
            None,
            None,
            None,
            Uuid::new_v4(),
            None,
        );
        assert_eq!(txn.total_price, None);
    }

    #[test]
    fn movement_type_signum() {
        assert_eq!(MovementType::In.signum(), 1);
        assert_eq!(MovementType::Out.signum(), -1);
    }
}

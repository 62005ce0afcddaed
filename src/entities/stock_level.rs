use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock level entity model.
///
/// One row per (material, warehouse) pair holds the current quantity plus a
/// `version` counter used for optimistic-concurrency checks on every
/// read-modify-write. The uniqueness of the pair is a database constraint.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[schema(as = StockLevel)]
#[sea_orm(table_name = "stock_levels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub material_id: Uuid,

    #[sea_orm(column_type = "Uuid")]
    pub warehouse_id: Uuid,

    pub current_stock: i32,

    pub safety_stock: i32,

    pub unit_price: Option<Decimal>,

    pub version: i32,

    pub last_updated: DateTime<Utc>,

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
    /// Creates a new stock level row for a (material, warehouse) pair.
    pub fn new(
        material_id: Uuid,
        warehouse_id: Uuid,
        current_stock: i32,
        safety_stock: i32,
        unit_price: Option<Decimal>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            material_id,
            warehouse_id,
            current_stock,
            safety_stock,
            unit_price,
            version: 0,
            last_updated: now,
            created_at: now,
        }
    }

    /// Whether the current quantity is at or below the safety stock threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.safety_stock
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.current_stock == 0
    }

    /// Total value of the held quantity at the last-known unit price.
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.current_stock) * self.unit_price.unwrap_or(Decimal::ZERO)
    }

    /// How many units short of the safety stock the level currently is.
    pub fn shortage(&self) -> i32 {
        (self.safety_stock - self.current_stock).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(current: i32, safety: i32, price: Option<Decimal>) -> Model {
        Model::new(Uuid::new_v4(), Uuid::new_v4(), current, safety, price)
    }

    #[test]
    fn low_stock_at_or_below_threshold() {
        assert!(level(2, 5, None).is_low_stock());
        assert!(level(5, 5, None).is_low_stock());
        assert!(!level(6, 5, None).is_low_stock());
    }

    #[test]
    fn out_of_stock_only_at_zero() {
        assert!(level(0, 0, None).is_out_of_stock());
        assert!(!level(1, 0, None).is_out_of_stock());
    }

    #[test]
    fn stock_value_uses_last_known_price() {
        assert_eq!(level(4, 0, Some(dec!(2.50))).stock_value(), dec!(10.00));
        assert_eq!(level(4, 0, None).stock_value(), Decimal::ZERO);
    }

    #[test]
    fn shortage_never_negative() {
        assert_eq!(level(2, 5, None).shortage(), 3);
        assert_eq!(level(7, 5, None).shortage(), 0);
    }

    #[test]
    fn derived_reads_are_pure() {
        let l = level(2, 5, Some(dec!(1.10)));
        assert_eq!(l.is_low_stock(), l.is_low_stock());
        assert_eq!(l.stock_value(), l.stock_value());
        assert_eq!(l.shortage(), l.shortage());
    }
}

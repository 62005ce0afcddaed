use crate::{
    entities::{
        material,
        stock_level::{self, Entity as StockLevels},
        stock_transaction::{self, Entity as StockTransactions, MovementType},
    },
    errors::ServiceError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Query as SeaQuery},
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// A named, validated read against the store. Each filter combination the
/// API exposes is a concrete query type rather than a dynamically assembled
/// filter object.
#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError>;
}

/// Sort order for stock level listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockSort {
    #[default]
    LastUpdated,
    CurrentStock,
}

#[derive(Debug, Clone, Default)]
pub struct ListStockLevelsQuery {
    pub material_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub material_base_id: Option<Uuid>,
    pub low_stock_only: bool,
    pub sort: StockSort,
    pub page: u64,
    pub limit: u64,
}

impl ListStockLevelsQuery {
    fn select(&self) -> Select<StockLevels> {
        let mut query = StockLevels::find();

        if let Some(material_id) = self.material_id {
            query = query.filter(stock_level::Column::MaterialId.eq(material_id));
        }
        if let Some(warehouse_id) = self.warehouse_id {
            query = query.filter(stock_level::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(base_id) = self.material_base_id {
            let materials_of_base = SeaQuery::select()
                .column(material::Column::Id)
                .from(material::Entity)
                .and_where(Expr::col(material::Column::MaterialBaseId).eq(base_id))
                .to_owned();
            query = query.filter(stock_level::Column::MaterialId.in_subquery(materials_of_base));
        }
        if self.low_stock_only {
            query = query.filter(
                Expr::col(stock_level::Column::CurrentStock)
                    .lte(Expr::col(stock_level::Column::SafetyStock)),
            );
        }

        match self.sort {
            StockSort::LastUpdated => query.order_by_desc(stock_level::Column::LastUpdated),
            StockSort::CurrentStock => query.order_by_asc(stock_level::Column::CurrentStock),
        }
    }
}

#[async_trait]
impl Query for ListStockLevelsQuery {
    type Result = (Vec<stock_level::Model>, u64);

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let paginator = self.select().paginate(db, self.limit.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(self.page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}

/// Shared filter over the movement ledger, applied identically by the list
/// and report queries.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub material_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Matches transaction notes or material names.
    pub search: Option<String>,
}

impl MovementFilter {
    fn apply(&self, mut query: Select<StockTransactions>) -> Select<StockTransactions> {
        if let Some(material_id) = self.material_id {
            query = query.filter(stock_transaction::Column::MaterialId.eq(material_id));
        }
        if let Some(warehouse_id) = self.warehouse_id {
            query = query.filter(stock_transaction::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(supplier_id) = self.supplier_id {
            query = query.filter(stock_transaction::Column::SupplierId.eq(supplier_id));
        }
        if let Some(project_id) = self.project_id {
            query = query.filter(stock_transaction::Column::ProjectId.eq(project_id));
        }
        if let Some(movement_type) = self.movement_type {
            query = query.filter(stock_transaction::Column::MovementType.eq(movement_type));
        }
        if let Some(from) = self.from {
            query = query.filter(stock_transaction::Column::CreatedAt.gte(from));
        }
        if let Some(to) = self.to {
            query = query.filter(stock_transaction::Column::CreatedAt.lte(to));
        }
        if let Some(term) = self.search.as_ref().filter(|t| !t.is_empty()) {
            let materials_by_name = SeaQuery::select()
                .column(material::Column::Id)
                .from(material::Entity)
                .and_where(Expr::col(material::Column::Name).like(format!("%{}%", term)))
                .to_owned();
            query = query.filter(
                Condition::any()
                    .add(stock_transaction::Column::Notes.contains(term.as_str()))
                    .add(stock_transaction::Column::MaterialId.in_subquery(materials_by_name)),
            );
        }

        query
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListMovementsQuery {
    pub filter: MovementFilter,
    pub page: u64,
    pub limit: u64,
}

#[async_trait]
impl Query for ListMovementsQuery {
    type Result = (Vec<stock_transaction::Model>, u64);

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let query = self
            .filter
            .apply(StockTransactions::find())
            .order_by_desc(stock_transaction::Column::CreatedAt);

        let paginator = query.paginate(db, self.limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(self.page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}

/// Dimension to group the movement report by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportGroupBy {
    Day,
    Week,
    Month,
    Material,
    Warehouse,
    Supplier,
    Project,
}

/// One group of the movement report.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportBucket {
    /// Date bucket (e.g. "2026-08-06", "2026-W32", "2026-08") or entity id.
    pub key: String,
    pub in_quantity: i64,
    pub out_quantity: i64,
    pub net_quantity: i64,
    pub in_value: Decimal,
    pub out_value: Decimal,
}

#[derive(Debug, Clone)]
pub struct MovementReportQuery {
    pub group_by: ReportGroupBy,
    pub filter: MovementFilter,
}

#[async_trait]
impl Query for MovementReportQuery {
    type Result = Vec<ReportBucket>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let transactions = self
            .filter
            .apply(StockTransactions::find())
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(aggregate_movements(self.group_by, &transactions))
    }
}

fn bucket_key(group_by: ReportGroupBy, txn: &stock_transaction::Model) -> Option<String> {
    match group_by {
        ReportGroupBy::Day => Some(txn.created_at.format("%Y-%m-%d").to_string()),
        ReportGroupBy::Week => Some(txn.created_at.format("%G-W%V").to_string()),
        ReportGroupBy::Month => Some(txn.created_at.format("%Y-%m").to_string()),
        ReportGroupBy::Material => Some(txn.material_id.to_string()),
        ReportGroupBy::Warehouse => Some(txn.warehouse_id.to_string()),
        // Movements without the attribution are out of scope for the group.
        ReportGroupBy::Supplier => txn.supplier_id.map(|id| id.to_string()),
        ReportGroupBy::Project => txn.project_id.map(|id| id.to_string()),
    }
}

/// Folds committed transactions into report buckets. Date-bucketed keys sort
/// ascending by construction (lexicographic order matches chronological for
/// the formats used); entity groupings are keyed by id.
pub(crate) fn aggregate_movements(
    group_by: ReportGroupBy,
    transactions: &[stock_transaction::Model],
) -> Vec<ReportBucket> {
    let mut buckets: BTreeMap<String, ReportBucket> = BTreeMap::new();

    for txn in transactions {
        let Some(key) = bucket_key(group_by, txn) else {
            continue;
        };

        let bucket = buckets.entry(key.clone()).or_insert_with(|| ReportBucket {
            key,
            in_quantity: 0,
            out_quantity: 0,
            net_quantity: 0,
            in_value: Decimal::ZERO,
            out_value: Decimal::ZERO,
        });

        let value = txn.total_price.unwrap_or(Decimal::ZERO);
        match txn.movement_type {
            MovementType::In => {
                bucket.in_quantity += txn.quantity as i64;
                bucket.in_value += value;
            }
            MovementType::Out => {
                bucket.out_quantity += txn.quantity as i64;
                bucket.out_value += value;
            }
        }
        bucket.net_quantity = bucket.in_quantity - bucket.out_quantity;
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn txn(
        movement_type: MovementType,
        material_id: Uuid,
        quantity: i32,
        unit_price: Option<Decimal>,
        day: u32,
    ) -> stock_transaction::Model {
        let mut model = stock_transaction::Model::new(
            movement_type,
            material_id,
            Uuid::new_v4(),
            quantity,
            unit_price,
            None,
            None,
            Uuid::new_v4(),
            None,
        );
        model.created_at = Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap();
        model
    }

    #[test]
    fn material_grouping_sums_in_out_and_net() {
        let m1 = Uuid::new_v4();
        let transactions = vec![
            txn(MovementType::In, m1, 10, Some(dec!(5.00)), 1),
            txn(MovementType::Out, m1, 4, None, 2),
        ];

        let report = aggregate_movements(ReportGroupBy::Material, &transactions);
        assert_eq!(report.len(), 1);
        let row = &report[0];
        assert_eq!(row.key, m1.to_string());
        assert_eq!(row.in_quantity, 10);
        assert_eq!(row.out_quantity, 4);
        assert_eq!(row.net_quantity, 6);
        assert_eq!(row.in_value, dec!(50.00));
        assert_eq!(row.out_value, Decimal::ZERO);
    }

    #[test]
    fn day_buckets_sorted_ascending() {
        let m1 = Uuid::new_v4();
        let transactions = vec![
            txn(MovementType::In, m1, 1, None, 20),
            txn(MovementType::In, m1, 1, None, 3),
            txn(MovementType::In, m1, 1, None, 11),
        ];

        let report = aggregate_movements(ReportGroupBy::Day, &transactions);
        let keys: Vec<_> = report.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["2026-08-03", "2026-08-11", "2026-08-20"]);
    }

    #[test]
    fn supplier_grouping_skips_unattributed_movements() {
        let supplier = Uuid::new_v4();
        let mut with_supplier = txn(MovementType::In, Uuid::new_v4(), 5, None, 1);
        with_supplier.supplier_id = Some(supplier);
        let without = txn(MovementType::In, Uuid::new_v4(), 7, None, 1);

        let report = aggregate_movements(ReportGroupBy::Supplier, &[with_supplier, without]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].key, supplier.to_string());
        assert_eq!(report[0].in_quantity, 5);
    }

    #[test]
    fn week_and_month_keys_are_stable() {
        let t = txn(MovementType::In, Uuid::new_v4(), 1, None, 6);
        assert_eq!(bucket_key(ReportGroupBy::Month, &t).unwrap(), "2026-08");
        assert!(bucket_key(ReportGroupBy::Week, &t)
            .unwrap()
            .starts_with("2026-W"));
    }
}

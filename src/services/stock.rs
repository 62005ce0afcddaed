use crate::{
    db::DbPool,
    entities::{
        material::Entity as Materials,
        stock_level::{self, Entity as StockLevels},
        stock_transaction::{self, Entity as StockTransactions, MovementType},
        warehouse::Entity as Warehouses,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set, SqlErr, TransactionError, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Inputs for recording one IN or OUT movement.
#[derive(Debug, Clone)]
pub struct RecordMovementCommand {
    pub movement_type: MovementType,
    pub material_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub supplier_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub notes: Option<String>,
    pub user_id: Uuid,
}

/// Inputs for seeding an initial balance without fabricating movement history.
#[derive(Debug, Clone)]
pub struct RegisterStockCommand {
    pub material_id: Uuid,
    pub warehouse_id: Uuid,
    pub current_stock: i32,
    pub safety_stock: i32,
    pub unit_price: Option<Decimal>,
    pub user_id: Uuid,
}

/// Inputs for a manual correction of an existing stock level.
#[derive(Debug, Clone)]
pub struct AdjustStockCommand {
    pub current_stock: Option<i32>,
    pub safety_stock: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub user_id: Uuid,
}

/// Result of a recorded movement: the appended transaction plus the stock
/// level snapshot after the write.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementOutcome {
    pub transaction: stock_transaction::Model,
    pub stock_level: stock_level::Model,
}

/// Service owning all mutations of stock levels and the movement ledger.
///
/// Every movement runs read -> check -> write inside one database
/// transaction, with an optimistic version check on the stock level update.
/// A losing writer rolls back completely and the attempt is retried from a
/// fresh read.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    retry_attempts: u32,
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl StockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, retry_attempts: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            retry_attempts: retry_attempts.max(1),
        }
    }

    /// Records one IN or OUT movement against a (material, warehouse) pair.
    ///
    /// IN seeds a zero-quantity stock level when none exists yet; OUT
    /// requires sufficient stock and rejects the whole call otherwise. On
    /// success exactly one transaction row is appended and the stock level
    /// is updated within the same atomic unit.
    #[instrument(skip(self, cmd), fields(material = %cmd.material_id, warehouse = %cmd.warehouse_id))]
    pub async fn record_movement(
        &self,
        cmd: RecordMovementCommand,
    ) -> Result<MovementOutcome, ServiceError> {
        if cmd.quantity <= 0 {
            return Err(ServiceError::InvalidInput(format!(
                "quantity must be a positive integer, got {}",
                cmd.quantity
            )));
        }

        self.ensure_material_usable(cmd.material_id).await?;
        self.ensure_warehouse_usable(cmd.warehouse_id).await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_record_movement(&cmd).await {
                Err(ServiceError::ConcurrentModification(id)) if attempt < self.retry_attempts => {
                    warn!(stock_level = %id, attempt, "stock level changed underneath movement, retrying");
                }
                Err(e) => return Err(e),
                Ok(outcome) => {
                    self.event_sender
                        .send_logged(Event::MovementRecorded {
                            transaction_id: outcome.transaction.id,
                            movement_type: outcome.transaction.movement_type,
                            material_id: cmd.material_id,
                            warehouse_id: cmd.warehouse_id,
                            quantity: cmd.quantity,
                            new_stock: outcome.stock_level.current_stock,
                            user_id: cmd.user_id,
                        })
                        .await;
                    return Ok(outcome);
                }
            }
        }
    }

    /// One movement attempt. Fails with `ConcurrentModification` when another
    /// writer won the version check; the caller retries from a fresh read.
    async fn try_record_movement(
        &self,
        cmd: &RecordMovementCommand,
    ) -> Result<MovementOutcome, ServiceError> {
        let cmd = cmd.clone();
        self.db_pool
            .transaction::<_, MovementOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = StockLevels::find()
                        .filter(stock_level::Column::MaterialId.eq(cmd.material_id))
                        .filter(stock_level::Column::WarehouseId.eq(cmd.warehouse_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let level = match (existing, cmd.movement_type) {
                        (Some(level), _) => level,
                        (None, MovementType::In) => {
                            // First receipt for this pair seeds an empty level.
                            let model = stock_level::Model::new(
                                cmd.material_id,
                                cmd.warehouse_id,
                                0,
                                0,
                                None,
                            );
                            let seed_id = model.id;
                            model.into_active_model().insert(txn).await.map_err(|e| {
                                if is_unique_violation(&e) {
                                    // A concurrent receipt created the row first.
                                    ServiceError::ConcurrentModification(seed_id)
                                } else {
                                    ServiceError::db_error(e)
                                }
                            })?
                        }
                        (None, MovementType::Out) => {
                            return Err(ServiceError::NotFound(format!(
                                "no stock level for material {} in warehouse {}",
                                cmd.material_id, cmd.warehouse_id
                            )));
                        }
                    };

                    let new_stock = match cmd.movement_type {
                        MovementType::In => level.current_stock + cmd.quantity,
                        MovementType::Out => {
                            if level.current_stock < cmd.quantity {
                                return Err(ServiceError::InsufficientStock(format!(
                                    "requested {}, available {}",
                                    cmd.quantity, level.current_stock
                                )));
                            }
                            level.current_stock - cmd.quantity
                        }
                    };

                    let now = Utc::now();
                    let update = stock_level::ActiveModel {
                        current_stock: Set(new_stock),
                        unit_price: if cmd.unit_price.is_some() {
                            Set(cmd.unit_price)
                        } else {
                            NotSet
                        },
                        version: Set(level.version + 1),
                        last_updated: Set(now),
                        ..Default::default()
                    };

                    let updated = StockLevels::update_many()
                        .set(update)
                        .filter(stock_level::Column::Id.eq(level.id))
                        .filter(stock_level::Column::Version.eq(level.version))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if updated.rows_affected == 0 {
                        return Err(ServiceError::ConcurrentModification(level.id));
                    }

                    // Supplier attribution only makes sense on receipts,
                    // project attribution only on issues.
                    let (supplier_id, project_id) = match cmd.movement_type {
                        MovementType::In => (cmd.supplier_id, None),
                        MovementType::Out => (None, cmd.project_id),
                    };

                    let transaction = stock_transaction::Model::new(
                        cmd.movement_type,
                        cmd.material_id,
                        cmd.warehouse_id,
                        cmd.quantity,
                        cmd.unit_price,
                        supplier_id,
                        project_id,
                        cmd.user_id,
                        cmd.notes.clone(),
                    )
                    .into_active_model()
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let stock_level = stock_level::Model {
                        current_stock: new_stock,
                        unit_price: cmd.unit_price.or(level.unit_price),
                        version: level.version + 1,
                        last_updated: now,
                        ..level
                    };

                    Ok(MovementOutcome {
                        transaction,
                        stock_level,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }

    /// Registers the starting balance for a (material, warehouse) pair.
    ///
    /// No transaction row is written; this is the designated way to seed
    /// balances. A second registration for the same pair fails with
    /// `Conflict`, mapped from the unique constraint.
    #[instrument(skip(self, cmd), fields(material = %cmd.material_id, warehouse = %cmd.warehouse_id))]
    pub async fn register_initial_stock(
        &self,
        cmd: RegisterStockCommand,
    ) -> Result<stock_level::Model, ServiceError> {
        if cmd.current_stock < 0 || cmd.safety_stock < 0 {
            return Err(ServiceError::InvalidInput(
                "stock quantities must not be negative".to_string(),
            ));
        }

        self.ensure_material_usable(cmd.material_id).await?;
        self.ensure_warehouse_usable(cmd.warehouse_id).await?;

        let model = stock_level::Model::new(
            cmd.material_id,
            cmd.warehouse_id,
            cmd.current_stock,
            cmd.safety_stock,
            cmd.unit_price,
        );

        let inserted = model
            .into_active_model()
            .insert(&*self.db_pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::Conflict(format!(
                        "stock level already registered for material {} in warehouse {}",
                        cmd.material_id, cmd.warehouse_id
                    ))
                } else {
                    ServiceError::db_error(e)
                }
            })?;

        self.event_sender
            .send_logged(Event::StockRegistered {
                stock_level_id: inserted.id,
                material_id: inserted.material_id,
                warehouse_id: inserted.warehouse_id,
                current_stock: inserted.current_stock,
                user_id: cmd.user_id,
            })
            .await;

        Ok(inserted)
    }

    /// Manually corrects a stock level (physical recount, damaged goods).
    ///
    /// This intentionally bypasses the movement ledger: no transaction row is
    /// written and the running balance diverges from the transaction sum at
    /// this point. The correction is tagged distinctly in the audit stream.
    #[instrument(skip(self, cmd))]
    pub async fn adjust_stock(
        &self,
        stock_level_id: Uuid,
        cmd: AdjustStockCommand,
    ) -> Result<stock_level::Model, ServiceError> {
        if cmd.current_stock.is_none() && cmd.safety_stock.is_none() && cmd.unit_price.is_none() {
            return Err(ServiceError::InvalidInput(
                "adjustment must change at least one field".to_string(),
            ));
        }
        if cmd.current_stock.is_some_and(|v| v < 0) || cmd.safety_stock.is_some_and(|v| v < 0) {
            return Err(ServiceError::InvalidInput(
                "stock quantities must not be negative".to_string(),
            ));
        }

        let level = StockLevels::find_by_id(stock_level_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("stock level {} not found", stock_level_id))
            })?;

        let mut active: stock_level::ActiveModel = level.clone().into();
        if let Some(stock) = cmd.current_stock {
            active.current_stock = Set(stock);
        }
        if let Some(safety) = cmd.safety_stock {
            active.safety_stock = Set(safety);
        }
        if let Some(price) = cmd.unit_price {
            active.unit_price = Set(Some(price));
        }
        active.version = Set(level.version + 1);
        active.last_updated = Set(Utc::now());

        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_logged(Event::StockManuallyAdjusted {
                stock_level_id,
                old_stock: level.current_stock,
                new_stock: updated.current_stock,
                old_safety_stock: level.safety_stock,
                new_safety_stock: updated.safety_stock,
                user_id: cmd.user_id,
            })
            .await;

        Ok(updated)
    }

    /// Fetches one stock level by id.
    pub async fn get_stock_level(&self, id: Uuid) -> Result<stock_level::Model, ServiceError> {
        StockLevels::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("stock level {} not found", id)))
    }

    /// Deletes a stock level. Blocked while any ledger transaction still
    /// references the same (material, warehouse) pair.
    #[instrument(skip(self))]
    pub async fn delete_stock_level(&self, id: Uuid) -> Result<(), ServiceError> {
        let level = self.get_stock_level(id).await?;

        let references = StockTransactions::find()
            .filter(stock_transaction::Column::MaterialId.eq(level.material_id))
            .filter(stock_transaction::Column::WarehouseId.eq(level.warehouse_id))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        if references > 0 {
            return Err(ServiceError::DependentRecordsExist(format!(
                "{} ledger transactions reference this stock level",
                references
            )));
        }

        StockLevels::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_logged(Event::StockLevelDeleted {
                stock_level_id: id,
                material_id: level.material_id,
                warehouse_id: level.warehouse_id,
            })
            .await;

        Ok(())
    }

    async fn ensure_material_usable(&self, material_id: Uuid) -> Result<(), ServiceError> {
        let material = Materials::find_by_id(material_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("material {} not found", material_id))
            })?;

        if !material.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "material {} is inactive",
                material_id
            )));
        }

        Ok(())
    }

    async fn ensure_warehouse_usable(&self, warehouse_id: Uuid) -> Result<(), ServiceError> {
        let warehouse = Warehouses::find_by_id(warehouse_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("warehouse {} not found", warehouse_id))
            })?;

        if !warehouse.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "warehouse {} is inactive",
                warehouse_id
            )));
        }

        Ok(())
    }
}

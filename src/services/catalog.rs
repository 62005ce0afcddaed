use crate::{
    db::DbPool,
    entities::{
        material::{self, Entity as Materials},
        project::{self, Entity as Projects},
        stock_level::{self, Entity as StockLevels},
        stock_transaction::{self, Entity as StockTransactions},
        supplier::{self, Entity as Suppliers},
        warehouse::{self, Entity as Warehouses},
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn conflict_on_unique(err: sea_orm::DbErr, what: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Conflict(format!("{} already exists", what))
    } else {
        ServiceError::db_error(err)
    }
}

/// Catalog services: the thin CRUD surface around the ledger's reference
/// entities. Unique codes are storage-layer constraints; deletes are blocked
/// while ledger rows still reference the entity.

#[derive(Debug, Clone)]
pub struct CreateMaterialCommand {
    pub material_base_id: Uuid,
    pub color_id: Option<Uuid>,
    pub name: String,
    pub finish: Option<String>,
    pub unit: String,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMaterialCommand {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
}

impl MaterialService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, cmd))]
    pub async fn create(
        &self,
        cmd: CreateMaterialCommand,
    ) -> Result<material::Model, ServiceError> {
        let mut model = material::Model::new(
            cmd.material_base_id,
            cmd.color_id,
            cmd.name,
            cmd.finish,
            cmd.unit,
            cmd.unit_price,
        );
        model.description = cmd.description;

        model
            .into_active_model()
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<material::Model, ServiceError> {
        Materials::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("material {} not found", id)))
    }

    pub async fn list(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<material::Model>, u64), ServiceError> {
        let mut query = Materials::find().order_by_asc(material::Column::Name);
        if let Some(term) = search.filter(|t| !t.is_empty()) {
            query = query.filter(material::Column::Name.contains(term.as_str()));
        }

        let paginator = query.paginate(&*self.db_pool, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Updates business fields. Reference fields (base, color) are fixed at
    /// creation and not touched here.
    #[instrument(skip(self, cmd))]
    pub async fn update(
        &self,
        id: Uuid,
        cmd: UpdateMaterialCommand,
    ) -> Result<material::Model, ServiceError> {
        let existing = self.get(id).await?;

        let mut active: material::ActiveModel = existing.into();
        if let Some(name) = cmd.name {
            active.name = Set(name);
        }
        if let Some(description) = cmd.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = cmd.unit_price {
            active.unit_price = Set(Some(price));
        }
        if let Some(is_active) = cmd.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let stock_refs = StockLevels::find()
            .filter(stock_level::Column::MaterialId.eq(id))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        let txn_refs = StockTransactions::find()
            .filter(stock_transaction::Column::MaterialId.eq(id))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        if stock_refs + txn_refs > 0 {
            return Err(ServiceError::DependentRecordsExist(format!(
                "material {} is referenced by {} stock levels and {} transactions",
                id, stock_refs, txn_refs
            )));
        }

        Materials::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CreateWarehouseCommand {
    pub code: String,
    pub name: String,
    pub location: Option<String>,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateWarehouseCommand {
    pub name: Option<String>,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, cmd))]
    pub async fn create(
        &self,
        cmd: CreateWarehouseCommand,
    ) -> Result<warehouse::Model, ServiceError> {
        let mut model = warehouse::Model::new(cmd.code.clone(), cmd.name, cmd.location);
        model.purpose = cmd.purpose;

        model
            .into_active_model()
            .insert(&*self.db_pool)
            .await
            .map_err(|e| conflict_on_unique(e, &format!("warehouse code {}", cmd.code)))
    }

    pub async fn get(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        Warehouses::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("warehouse {} not found", id)))
    }

    pub async fn list(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<warehouse::Model>, u64), ServiceError> {
        let mut query = Warehouses::find().order_by_asc(warehouse::Column::Code);
        if let Some(term) = search.filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(warehouse::Column::Code.contains(term.as_str()))
                    .add(warehouse::Column::Name.contains(term.as_str())),
            );
        }

        let paginator = query.paginate(&*self.db_pool, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    #[instrument(skip(self, cmd))]
    pub async fn update(
        &self,
        id: Uuid,
        cmd: UpdateWarehouseCommand,
    ) -> Result<warehouse::Model, ServiceError> {
        let existing = self.get(id).await?;

        let mut active: warehouse::ActiveModel = existing.into();
        if let Some(name) = cmd.name {
            active.name = Set(name);
        }
        if let Some(location) = cmd.location {
            active.location = Set(Some(location));
        }
        if let Some(purpose) = cmd.purpose {
            active.purpose = Set(Some(purpose));
        }
        if let Some(is_active) = cmd.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        active
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let stock_refs = StockLevels::find()
            .filter(stock_level::Column::WarehouseId.eq(id))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        let txn_refs = StockTransactions::find()
            .filter(stock_transaction::Column::WarehouseId.eq(id))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        if stock_refs + txn_refs > 0 {
            return Err(ServiceError::DependentRecordsExist(format!(
                "warehouse {} is referenced by {} stock levels and {} transactions",
                id, stock_refs, txn_refs
            )));
        }

        Warehouses::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        code: String,
        name: String,
        contact_email: Option<String>,
        phone: Option<String>,
    ) -> Result<supplier::Model, ServiceError> {
        let mut model = supplier::Model::new(code.clone(), name);
        model.contact_email = contact_email;
        model.phone = phone;

        model
            .into_active_model()
            .insert(&*self.db_pool)
            .await
            .map_err(|e| conflict_on_unique(e, &format!("supplier code {}", code)))
    }

    pub async fn get(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        Suppliers::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("supplier {} not found", id)))
    }

    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let paginator = Suppliers::find()
            .order_by_asc(supplier::Column::Code)
            .paginate(&*self.db_pool, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let txn_refs = StockTransactions::find()
            .filter(stock_transaction::Column::SupplierId.eq(id))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        if txn_refs > 0 {
            return Err(ServiceError::DependentRecordsExist(format!(
                "supplier {} is referenced by {} transactions",
                id, txn_refs
            )));
        }

        Suppliers::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct ProjectService {
    db_pool: Arc<DbPool>,
}

impl ProjectService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, code: String, name: String) -> Result<project::Model, ServiceError> {
        project::Model::new(code.clone(), name)
            .into_active_model()
            .insert(&*self.db_pool)
            .await
            .map_err(|e| conflict_on_unique(e, &format!("project code {}", code)))
    }

    pub async fn get(&self, id: Uuid) -> Result<project::Model, ServiceError> {
        Projects::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("project {} not found", id)))
    }

    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<project::Model>, u64), ServiceError> {
        let paginator = Projects::find()
            .order_by_asc(project::Column::Code)
            .paginate(&*self.db_pool, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let txn_refs = StockTransactions::find()
            .filter(stock_transaction::Column::ProjectId.eq(id))
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        if txn_refs > 0 {
            return Err(ServiceError::DependentRecordsExist(format!(
                "project {} is referenced by {} transactions",
                id, txn_refs
            )));
        }

        Projects::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(())
    }
}

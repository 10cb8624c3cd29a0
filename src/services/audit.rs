//! Read-only queries over the audit trails.
//!
//! Every filter combination is side-effect free; combinations that match
//! nothing return an empty ordered sequence, never an error. Rows always
//! come back newest first.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::{
        chemical_audit::{self, Entity as ChemicalAuditEntity},
        inventory_audit::{self, Entity as InventoryAuditEntity},
        location_audit::{self, Entity as LocationAuditEntity},
    },
    errors::ServiceError,
};

const DEFAULT_PAGE_LIMIT: u64 = 100;
const MAX_PAGE_LIMIT: u64 = 500;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InventoryAuditQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub inventory_item_id: Option<i32>,
    pub field_name: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChemicalAuditQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub chemical_id: Option<i32>,
    pub field_name: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LocationAuditQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub location_id: Option<i32>,
    pub field_name: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn page_window(skip: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (
        skip.unwrap_or(0),
        limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
    )
}

/// Read-only access to the three audit tables.
#[derive(Clone)]
pub struct AuditQueryService {
    db_pool: Arc<DbPool>,
}

impl AuditQueryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_inventory_audits(
        &self,
        query: InventoryAuditQuery,
    ) -> Result<Vec<inventory_audit::Model>, ServiceError> {
        let (skip, limit) = page_window(query.skip, query.limit);
        let mut select = InventoryAuditEntity::find();

        if let Some(item_id) = query.inventory_item_id {
            select = select.filter(inventory_audit::Column::InventoryItemId.eq(item_id));
        }
        if let Some(field_name) = &query.field_name {
            select = select.filter(inventory_audit::Column::FieldName.eq(field_name.clone()));
        }
        if let Some(action) = &query.action {
            select = select.filter(inventory_audit::Column::Action.eq(action.clone()));
        }
        if let Some(user_id) = query.user_id {
            select = select.filter(inventory_audit::Column::UserId.eq(user_id));
        }
        if let Some(start) = query.start_date {
            select = select.filter(inventory_audit::Column::Timestamp.gte(start));
        }
        if let Some(end) = query.end_date {
            select = select.filter(inventory_audit::Column::Timestamp.lte(end));
        }

        select
            .order_by_desc(inventory_audit::Column::Timestamp)
            .order_by_desc(inventory_audit::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list_chemical_audits(
        &self,
        query: ChemicalAuditQuery,
    ) -> Result<Vec<chemical_audit::Model>, ServiceError> {
        let (skip, limit) = page_window(query.skip, query.limit);
        let mut select = ChemicalAuditEntity::find();

        if let Some(chemical_id) = query.chemical_id {
            select = select.filter(chemical_audit::Column::ChemicalId.eq(chemical_id));
        }
        if let Some(field_name) = &query.field_name {
            select = select.filter(chemical_audit::Column::FieldName.eq(field_name.clone()));
        }
        if let Some(action) = &query.action {
            select = select.filter(chemical_audit::Column::Action.eq(action.clone()));
        }
        if let Some(user_id) = query.user_id {
            select = select.filter(chemical_audit::Column::UserId.eq(user_id));
        }
        if let Some(start) = query.start_date {
            select = select.filter(chemical_audit::Column::Timestamp.gte(start));
        }
        if let Some(end) = query.end_date {
            select = select.filter(chemical_audit::Column::Timestamp.lte(end));
        }

        select
            .order_by_desc(chemical_audit::Column::Timestamp)
            .order_by_desc(chemical_audit::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list_location_audits(
        &self,
        query: LocationAuditQuery,
    ) -> Result<Vec<location_audit::Model>, ServiceError> {
        let (skip, limit) = page_window(query.skip, query.limit);
        let mut select = LocationAuditEntity::find();

        if let Some(location_id) = query.location_id {
            select = select.filter(location_audit::Column::LocationId.eq(location_id));
        }
        if let Some(field_name) = &query.field_name {
            select = select.filter(location_audit::Column::FieldName.eq(field_name.clone()));
        }
        if let Some(action) = &query.action {
            select = select.filter(location_audit::Column::Action.eq(action.clone()));
        }
        if let Some(user_id) = query.user_id {
            select = select.filter(location_audit::Column::UserId.eq(user_id));
        }
        if let Some(start) = query.start_date {
            select = select.filter(location_audit::Column::Timestamp.gte(start));
        }
        if let Some(end) = query.end_date {
            select = select.filter(location_audit::Column::Timestamp.lte(end));
        }

        select
            .order_by_desc(location_audit::Column::Timestamp)
            .order_by_desc(location_audit::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}

//! The inventory ledger.
//!
//! This service is the only code path that mutates `inventory_items.quantity`.
//! Every quantity-affecting operation writes the item row, one
//! `inventory_changes` row and one or more `inventory_audits` rows inside a
//! single transaction, with the item row exclusively locked across the
//! read-modify-write so concurrent deltas cannot lose updates. Fan-out to
//! subscribers happens only after the transaction commits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        chemical::Entity as ChemicalEntity,
        experiment::Entity as ExperimentEntity,
        inventory_audit,
        inventory_change::{self, Entity as InventoryChangeEntity},
        inventory_item::{self, Entity as InventoryItemEntity},
        location::Entity as LocationEntity,
        AuditAction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{datetime_text, decimal_text, opt_datetime_text, opt_text, unwrap_txn_err},
    ws::{Action, Resource},
};

/// Reason recorded on the ledger entry emitted by item creation.
pub const REASON_INITIAL_CREATION: &str = "Initial inventory creation";
/// Reason recorded when a quantity is overwritten through an item update.
pub const REASON_MANUAL_UPDATE: &str = "Manual inventory update";

/// Field name used for the single CREATE audit row summarizing a new item.
const CREATE_AUDIT_FIELD: &str = "item";

const DEFAULT_PAGE_LIMIT: u64 = 100;
const MAX_PAGE_LIMIT: u64 = 500;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    pub chemical_id: i32,
    pub location_id: i32,
    pub quantity: Decimal,
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[validate(length(min = 1, message = "Batch number is required"))]
    pub batch_number: String,
    pub expiration_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub chemical_id: Option<i32>,
    pub location_id: Option<i32>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub batch_number: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordChangeRequest {
    pub inventory_item_id: i32,
    pub delta: Decimal,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
    pub experiment_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListItemsQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub chemical_id: Option<i32>,
    pub location_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListChangesQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub inventory_item_id: Option<i32>,
}

/// Computes the quantity after applying a signed delta, enforcing the
/// non-negative invariant before anything is persisted.
pub(crate) fn next_quantity(current: Decimal, delta: Decimal) -> Result<Decimal, ServiceError> {
    let next = current + delta;
    if next < Decimal::ZERO {
        return Err(ServiceError::InvalidState(
            "Inventory quantity cannot be negative".into(),
        ));
    }
    Ok(next)
}

fn page_window(skip: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (
        skip.unwrap_or(0),
        limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
    )
}

// Reference resolution helpers keep the transaction bodies declarative;
// each failure names the entity kind and id.

async fn require_chemical<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), ServiceError> {
    ChemicalEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Chemical {}", id)))
}

async fn require_location<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), ServiceError> {
    LocationEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Location {}", id)))
}

async fn require_experiment<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), ServiceError> {
    ExperimentEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Experiment {}", id)))
}

fn audit_row(
    item_id: i32,
    actor_id: i32,
    field_name: &str,
    old_value: String,
    new_value: String,
    action: AuditAction,
    timestamp: DateTime<Utc>,
) -> inventory_audit::ActiveModel {
    inventory_audit::ActiveModel {
        inventory_item_id: Set(item_id),
        user_id: Set(actor_id),
        field_name: Set(field_name.to_string()),
        old_value: Set(old_value),
        new_value: Set(new_value),
        action: Set(action.as_str().to_string()),
        timestamp: Set(timestamp),
        ..Default::default()
    }
}

/// Service owning all writes to inventory quantities.
#[derive(Clone)]
pub struct LedgerService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl LedgerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an inventory item together with its opening ledger entry and
    /// CREATE audit row. Fails with `NotFound` when the chemical or location
    /// reference does not resolve; nothing persists on failure.
    #[instrument(skip(self, request), fields(chemical_id = request.chemical_id, location_id = request.location_id))]
    pub async fn create_item(
        &self,
        request: CreateItemRequest,
        actor_id: i32,
    ) -> Result<inventory_item::Model, ServiceError> {
        request.validate()?;
        if request.quantity < Decimal::ZERO {
            return Err(ServiceError::InvalidState(
                "Inventory quantity cannot be negative".into(),
            ));
        }

        let db = self.db_pool.as_ref();
        let item = db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    require_chemical(txn, request.chemical_id).await?;
                    require_location(txn, request.location_id).await?;

                    let now = Utc::now();
                    let item = inventory_item::ActiveModel {
                        chemical_id: Set(request.chemical_id),
                        location_id: Set(request.location_id),
                        quantity: Set(request.quantity),
                        unit: Set(request.unit.clone()),
                        batch_number: Set(request.batch_number.clone()),
                        expiration_date: Set(request.expiration_date),
                        supplier: Set(request.supplier.clone()),
                        acquisition_date: Set(request.acquisition_date),
                        created_at: Set(now),
                        updated_at: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    inventory_change::ActiveModel {
                        inventory_item_id: Set(item.id),
                        user_id: Set(actor_id),
                        delta: Set(request.quantity),
                        reason: Set(REASON_INITIAL_CREATION.to_string()),
                        experiment_id: Set(None),
                        timestamp: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let summary = json!({
                        "chemical_id": item.chemical_id,
                        "location_id": item.location_id,
                        "quantity": decimal_text(&item.quantity),
                        "unit": item.unit,
                        "batch_number": item.batch_number,
                        "expiration_date": opt_datetime_text(&item.expiration_date),
                        "supplier": opt_text(&item.supplier),
                        "acquisition_date": opt_datetime_text(&item.acquisition_date),
                    })
                    .to_string();

                    audit_row(
                        item.id,
                        actor_id,
                        CREATE_AUDIT_FIELD,
                        String::new(),
                        summary,
                        AuditAction::Create,
                        now,
                    )
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok(item)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(item_id = item.id, "Inventory item created");
        self.notify(Action::Create, &item).await;
        Ok(item)
    }

    /// Applies a partial update. Each changed field gets its own UPDATE audit
    /// row; a quantity change additionally appends a ledger entry with reason
    /// "Manual inventory update". Everything commits atomically or not at all.
    #[instrument(skip(self, request), fields(item_id = item_id))]
    pub async fn update_item(
        &self,
        item_id: i32,
        request: UpdateItemRequest,
        actor_id: i32,
    ) -> Result<inventory_item::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let item = db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = InventoryItemEntity::find_by_id(item_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Inventory item {}", item_id))
                        })?;

                    let now = Utc::now();
                    let mut active: inventory_item::ActiveModel = item.clone().into();
                    let mut audits: Vec<inventory_audit::ActiveModel> = Vec::new();

                    if let Some(chemical_id) = request.chemical_id {
                        if chemical_id != item.chemical_id {
                            require_chemical(txn, chemical_id).await?;
                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "chemical_id",
                                item.chemical_id.to_string(),
                                chemical_id.to_string(),
                                AuditAction::Update,
                                now,
                            ));
                            active.chemical_id = Set(chemical_id);
                        }
                    }

                    if let Some(location_id) = request.location_id {
                        if location_id != item.location_id {
                            require_location(txn, location_id).await?;
                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "location_id",
                                item.location_id.to_string(),
                                location_id.to_string(),
                                AuditAction::Update,
                                now,
                            ));
                            active.location_id = Set(location_id);
                        }
                    }

                    if let Some(unit) = &request.unit {
                        if unit != &item.unit {
                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "unit",
                                item.unit.clone(),
                                unit.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.unit = Set(unit.clone());
                        }
                    }

                    if let Some(batch_number) = &request.batch_number {
                        if batch_number != &item.batch_number {
                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "batch_number",
                                item.batch_number.clone(),
                                batch_number.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.batch_number = Set(batch_number.clone());
                        }
                    }

                    if let Some(expiration_date) = request.expiration_date {
                        if Some(expiration_date) != item.expiration_date {
                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "expiration_date",
                                opt_datetime_text(&item.expiration_date),
                                datetime_text(&expiration_date),
                                AuditAction::Update,
                                now,
                            ));
                            active.expiration_date = Set(Some(expiration_date));
                        }
                    }

                    if let Some(supplier) = &request.supplier {
                        if Some(supplier) != item.supplier.as_ref() {
                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "supplier",
                                opt_text(&item.supplier),
                                supplier.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.supplier = Set(Some(supplier.clone()));
                        }
                    }

                    if let Some(acquisition_date) = request.acquisition_date {
                        if Some(acquisition_date) != item.acquisition_date {
                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "acquisition_date",
                                opt_datetime_text(&item.acquisition_date),
                                datetime_text(&acquisition_date),
                                AuditAction::Update,
                                now,
                            ));
                            active.acquisition_date = Set(Some(acquisition_date));
                        }
                    }

                    if let Some(new_quantity) = request.quantity {
                        if new_quantity != item.quantity {
                            if new_quantity < Decimal::ZERO {
                                return Err(ServiceError::InvalidState(
                                    "Inventory quantity cannot be negative".into(),
                                ));
                            }
                            let delta = new_quantity - item.quantity;
                            inventory_change::ActiveModel {
                                inventory_item_id: Set(item.id),
                                user_id: Set(actor_id),
                                delta: Set(delta),
                                reason: Set(REASON_MANUAL_UPDATE.to_string()),
                                experiment_id: Set(None),
                                timestamp: Set(now),
                                ..Default::default()
                            }
                            .insert(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                            audits.push(audit_row(
                                item.id,
                                actor_id,
                                "quantity",
                                decimal_text(&item.quantity),
                                decimal_text(&new_quantity),
                                AuditAction::Update,
                                now,
                            ));
                            active.quantity = Set(new_quantity);
                        }
                    }

                    let updated = if audits.is_empty() {
                        item
                    } else {
                        active.updated_at = Set(Some(now));
                        active.update(txn).await.map_err(ServiceError::db_error)?
                    };

                    for audit in audits {
                        audit.insert(txn).await.map_err(ServiceError::db_error)?;
                    }

                    Ok(updated)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(item_id = item.id, "Inventory item updated");
        self.notify(Action::Update, &item).await;
        Ok(item)
    }

    /// Appends a consumption/addition entry to the ledger and moves the
    /// item's quantity by the signed delta. The negativity check runs before
    /// any row is written, so a rejected call leaves no trace.
    #[instrument(skip(self, request), fields(item_id = request.inventory_item_id, delta = %request.delta))]
    pub async fn record_change(
        &self,
        request: RecordChangeRequest,
        actor_id: i32,
    ) -> Result<(inventory_change::Model, inventory_item::Model), ServiceError> {
        request.validate()?;

        let db = self.db_pool.as_ref();
        let (change, item) = db
            .transaction::<_, (inventory_change::Model, inventory_item::Model), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let item = InventoryItemEntity::find_by_id(request.inventory_item_id)
                            .lock_exclusive()
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Inventory item {}",
                                    request.inventory_item_id
                                ))
                            })?;

                        if let Some(experiment_id) = request.experiment_id {
                            require_experiment(txn, experiment_id).await?;
                        }

                        let new_quantity = next_quantity(item.quantity, request.delta)?;
                        let now = Utc::now();

                        let change = inventory_change::ActiveModel {
                            inventory_item_id: Set(item.id),
                            user_id: Set(actor_id),
                            delta: Set(request.delta),
                            reason: Set(request.reason.clone()),
                            experiment_id: Set(request.experiment_id),
                            timestamp: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        audit_row(
                            item.id,
                            actor_id,
                            "quantity",
                            decimal_text(&item.quantity),
                            decimal_text(&new_quantity),
                            AuditAction::Update,
                            now,
                        )
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        let mut active: inventory_item::ActiveModel = item.into();
                        active.quantity = Set(new_quantity);
                        active.updated_at = Set(Some(now));
                        let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                        Ok((change, updated))
                    })
                },
            )
            .await
            .map_err(unwrap_txn_err)?;

        info!(
            item_id = item.id,
            change_id = change.id,
            "Inventory change recorded"
        );
        self.notify(Action::Update, &item).await;
        Ok((change, item))
    }

    /// Retrieves a single item by id.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: i32) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(item_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {}", item_id)))
    }

    /// Lists items with optional reference filters and a free-text search
    /// over chemical name, CAS number and batch number.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        query: ListItemsQuery,
    ) -> Result<(Vec<inventory_item::Model>, u64), ServiceError> {
        use crate::entities::chemical;

        let (skip, limit) = page_window(query.skip, query.limit);
        let mut select = InventoryItemEntity::find();

        if let Some(chemical_id) = query.chemical_id {
            select = select.filter(inventory_item::Column::ChemicalId.eq(chemical_id));
        }
        if let Some(location_id) = query.location_id {
            select = select.filter(inventory_item::Column::LocationId.eq(location_id));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            select = select
                .join(JoinType::InnerJoin, inventory_item::Relation::Chemical.def())
                .filter(
                    Condition::any()
                        .add(chemical::Column::Name.contains(search))
                        .add(chemical::Column::CasNumber.contains(search))
                        .add(inventory_item::Column::BatchNumber.contains(search)),
                );
        }

        let total = select
            .clone()
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let items = select
            .order_by_asc(inventory_item::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Lists ledger entries, newest first.
    #[instrument(skip(self))]
    pub async fn list_changes(
        &self,
        query: ListChangesQuery,
    ) -> Result<Vec<inventory_change::Model>, ServiceError> {
        let (skip, limit) = page_window(query.skip, query.limit);
        let mut select = InventoryChangeEntity::find();

        if let Some(item_id) = query.inventory_item_id {
            select = select.filter(inventory_change::Column::InventoryItemId.eq(item_id));
        }

        select
            .order_by_desc(inventory_change::Column::Timestamp)
            .order_by_desc(inventory_change::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn notify(&self, action: Action, item: &inventory_item::Model) {
        let payload = serde_json::to_value(item).unwrap_or(serde_json::Value::Null);
        if let Err(e) = self
            .event_sender
            .send(Event::new(Resource::Inventory, action, payload))
            .await
        {
            warn!(error = %e, item_id = item.id, "Failed to queue inventory event");
        }
    }
}

/// Serializable view of an item for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryItemResponse {
    pub id: i32,
    pub chemical_id: i32,
    pub location_id: i32,
    pub quantity: Decimal,
    pub unit: String,
    pub batch_number: String,
    pub expiration_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<inventory_item::Model> for InventoryItemResponse {
    fn from(model: inventory_item::Model) -> Self {
        Self {
            id: model.id,
            chemical_id: model.chemical_id,
            location_id: model.location_id,
            quantity: model.quantity,
            unit: model.unit,
            batch_number: model.batch_number,
            expiration_date: model.expiration_date,
            supplier: model.supplier,
            acquisition_date: model.acquisition_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn next_quantity_rejects_overdraw() {
        assert_eq!(next_quantity(dec!(10), dec!(-3)).unwrap(), dec!(7));
        assert!(matches!(
            next_quantity(dec!(10), dec!(-11)),
            Err(ServiceError::InvalidState(_))
        ));
        // Draining to exactly zero is allowed
        assert_eq!(next_quantity(dec!(5), dec!(-5)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn page_window_caps_limit() {
        assert_eq!(page_window(None, None), (0, DEFAULT_PAGE_LIMIT));
        assert_eq!(page_window(Some(40), Some(20)), (40, 20));
        assert_eq!(page_window(None, Some(10_000)), (0, MAX_PAGE_LIMIT));
    }

    proptest! {
        /// Applying any sequence of deltas keeps the running quantity equal
        /// to the sum of accepted deltas, and never below zero.
        #[test]
        fn ledger_reconciles_over_any_delta_sequence(
            initial in 0i64..1_000_000,
            deltas in prop::collection::vec(-500_000i64..500_000, 0..50),
        ) {
            let initial = Decimal::from(initial);
            let mut quantity = initial;
            let mut accepted_sum = Decimal::ZERO;

            for raw in deltas {
                let delta = Decimal::from(raw);
                match next_quantity(quantity, delta) {
                    Ok(next) => {
                        quantity = next;
                        accepted_sum += delta;
                    }
                    Err(_) => {
                        // A rejected delta must leave the quantity unchanged
                        prop_assert!(quantity + delta < Decimal::ZERO);
                    }
                }
                prop_assert!(quantity >= Decimal::ZERO);
            }

            prop_assert_eq!(quantity, initial + accepted_sum);
        }
    }
}

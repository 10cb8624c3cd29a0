//! Storage locations with a field-level audit trail and live updates.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItemEntity},
        location::{self, Entity as LocationEntity},
        location_audit, AuditAction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::unwrap_txn_err,
    ws::{Action, Resource},
};

const DEFAULT_PAGE_LIMIT: u64 = 100;
const MAX_PAGE_LIMIT: u64 = 500;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListLocationsQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

fn audit_row(
    location_id: i32,
    actor_id: i32,
    field_name: &str,
    old_value: String,
    new_value: String,
    action: AuditAction,
    timestamp: DateTime<Utc>,
) -> location_audit::ActiveModel {
    location_audit::ActiveModel {
        location_id: Set(location_id),
        user_id: Set(actor_id),
        field_name: Set(field_name.to_string()),
        old_value: Set(old_value),
        new_value: Set(new_value),
        action: Set(action.as_str().to_string()),
        timestamp: Set(timestamp),
        ..Default::default()
    }
}

#[derive(Clone)]
pub struct LocationsService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl LocationsService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a location. Fails with `Conflict` on a duplicate name.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateLocationRequest,
        actor_id: i32,
    ) -> Result<location::Model, ServiceError> {
        request.validate()?;

        let db = self.db_pool.as_ref();
        let created = db
            .transaction::<_, location::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = LocationEntity::find()
                        .filter(location::Column::Name.eq(request.name.clone()))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if existing.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Location with name {} already exists",
                            request.name
                        )));
                    }

                    let now = Utc::now();
                    let model = location::ActiveModel {
                        name: Set(request.name.clone()),
                        description: Set(request.description.clone()),
                        created_at: Set(now),
                        updated_at: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    audit_row(
                        model.id,
                        actor_id,
                        "name",
                        String::new(),
                        model.name.clone(),
                        AuditAction::Create,
                        now,
                    )
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    if let Some(description) = &model.description {
                        audit_row(
                            model.id,
                            actor_id,
                            "description",
                            String::new(),
                            description.clone(),
                            AuditAction::Create,
                            now,
                        )
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    }

                    Ok(model)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(location_id = created.id, "Location created");
        self.notify(Action::Create, &created).await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, location_id: i32) -> Result<location::Model, ServiceError> {
        LocationEntity::find_by_id(location_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {}", location_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: ListLocationsQuery,
    ) -> Result<(Vec<location::Model>, u64), ServiceError> {
        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);

        let mut select = LocationEntity::find();
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(location::Column::Name.contains(search))
                    .add(location::Column::Description.contains(search)),
            );
        }

        let total = select
            .clone()
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let locations = select
            .order_by_asc(location::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((locations, total))
    }

    /// Applies a partial update, auditing every changed field.
    #[instrument(skip(self, request), fields(location_id = location_id))]
    pub async fn update(
        &self,
        location_id: i32,
        request: UpdateLocationRequest,
        actor_id: i32,
    ) -> Result<location::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let updated = db
            .transaction::<_, location::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let model = LocationEntity::find_by_id(location_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Location {}", location_id))
                        })?;

                    if let Some(name) = &request.name {
                        if name != &model.name {
                            let taken = LocationEntity::find()
                                .filter(location::Column::Name.eq(name.clone()))
                                .filter(location::Column::Id.ne(location_id))
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                            if taken.is_some() {
                                return Err(ServiceError::Conflict(format!(
                                    "Location with name {} already exists",
                                    name
                                )));
                            }
                        }
                    }

                    let now = Utc::now();
                    let mut active: location::ActiveModel = model.clone().into();
                    let mut audits: Vec<location_audit::ActiveModel> = Vec::new();

                    if let Some(name) = &request.name {
                        if name != &model.name {
                            audits.push(audit_row(
                                model.id,
                                actor_id,
                                "name",
                                model.name.clone(),
                                name.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.name = Set(name.clone());
                        }
                    }

                    if let Some(description) = &request.description {
                        if model.description.as_ref() != Some(description) {
                            audits.push(audit_row(
                                model.id,
                                actor_id,
                                "description",
                                model.description.clone().unwrap_or_default(),
                                description.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.description = Set(Some(description.clone()));
                        }
                    }

                    let updated = if audits.is_empty() {
                        model
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

        info!(location_id = updated.id, "Location updated");
        self.notify(Action::Update, &updated).await;
        Ok(updated)
    }

    /// Deletes a location. Rejected with `Conflict` while inventory items
    /// still reference it; the DELETE audit row survives the entity.
    #[instrument(skip(self))]
    pub async fn delete(&self, location_id: i32, actor_id: i32) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let deleted = db
            .transaction::<_, location::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let model = LocationEntity::find_by_id(location_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Location {}", location_id))
                        })?;

                    let in_use = InventoryItemEntity::find()
                        .filter(inventory_item::Column::LocationId.eq(location_id))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if in_use > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Cannot delete location {} while it is associated with inventory items",
                            location_id
                        )));
                    }

                    audit_row(
                        model.id,
                        actor_id,
                        "location",
                        model.name.clone(),
                        String::new(),
                        AuditAction::Delete,
                        Utc::now(),
                    )
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    model
                        .clone()
                        .delete(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    Ok(model)
                })
            })
            .await
            .map_err(unwrap_txn_err)?;

        info!(location_id, "Location deleted");
        self.notify(Action::Delete, &deleted).await;
        Ok(())
    }

    async fn notify(&self, action: Action, location: &location::Model) {
        let payload = serde_json::to_value(location).unwrap_or(json!(null));
        if let Err(e) = self
            .event_sender
            .send(Event::new(Resource::Locations, action, payload))
            .await
        {
            warn!(error = %e, location_id = location.id, "Failed to queue location event");
        }
    }
}

//! Chemical catalog with a field-level audit trail.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        chemical::{self, Entity as ChemicalEntity},
        chemical_audit,
        inventory_item::{self, Entity as InventoryItemEntity},
        AuditAction,
    },
    errors::ServiceError,
    services::unwrap_txn_err,
};

const DEFAULT_PAGE_LIMIT: u64 = 100;
const MAX_PAGE_LIMIT: u64 = 500;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateChemicalRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub cas_number: Option<String>,
    pub formula: Option<String>,
    pub molecular_weight: Option<f64>,
    pub description: Option<String>,
    pub hazard_information: Option<String>,
    pub storage_conditions: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateChemicalRequest {
    pub name: Option<String>,
    pub cas_number: Option<String>,
    pub formula: Option<String>,
    pub molecular_weight: Option<f64>,
    pub description: Option<String>,
    pub hazard_information: Option<String>,
    pub storage_conditions: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListChemicalsQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

fn audit_row(
    chemical_id: i32,
    actor_id: i32,
    field_name: &str,
    old_value: String,
    new_value: String,
    action: AuditAction,
    timestamp: DateTime<Utc>,
) -> chemical_audit::ActiveModel {
    chemical_audit::ActiveModel {
        chemical_id: Set(chemical_id),
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
pub struct ChemicalsService {
    db_pool: Arc<DbPool>,
}

impl ChemicalsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates a chemical. Fails with `Conflict` when the CAS number is
    /// already registered.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateChemicalRequest,
        actor_id: i32,
    ) -> Result<chemical::Model, ServiceError> {
        request.validate()?;

        let db = self.db_pool.as_ref();
        let created = db
            .transaction::<_, chemical::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    if let Some(cas_number) = &request.cas_number {
                        let existing = ChemicalEntity::find()
                            .filter(chemical::Column::CasNumber.eq(cas_number.clone()))
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                        if existing.is_some() {
                            return Err(ServiceError::Conflict(format!(
                                "Chemical with CAS number {} already exists",
                                cas_number
                            )));
                        }
                    }

                    let now = Utc::now();
                    let model = chemical::ActiveModel {
                        name: Set(request.name.clone()),
                        cas_number: Set(request.cas_number.clone()),
                        formula: Set(request.formula.clone()),
                        molecular_weight: Set(request.molecular_weight),
                        description: Set(request.description.clone()),
                        hazard_information: Set(request.hazard_information.clone()),
                        storage_conditions: Set(request.storage_conditions.clone()),
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

                    if let Some(cas_number) = &model.cas_number {
                        audit_row(
                            model.id,
                            actor_id,
                            "cas_number",
                            String::new(),
                            cas_number.clone(),
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

        info!(chemical_id = created.id, "Chemical created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, chemical_id: i32) -> Result<chemical::Model, ServiceError> {
        ChemicalEntity::find_by_id(chemical_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Chemical {}", chemical_id)))
    }

    /// Lists chemicals with optional free-text search over name, CAS number,
    /// formula and description.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: ListChemicalsQuery,
    ) -> Result<(Vec<chemical::Model>, u64), ServiceError> {
        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);

        let mut select = ChemicalEntity::find();
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(chemical::Column::Name.contains(search))
                    .add(chemical::Column::CasNumber.contains(search))
                    .add(chemical::Column::Formula.contains(search))
                    .add(chemical::Column::Description.contains(search)),
            );
        }

        let total = select
            .clone()
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let chemicals = select
            .order_by_asc(chemical::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((chemicals, total))
    }

    /// Applies a partial update, auditing every changed field.
    #[instrument(skip(self, request), fields(chemical_id = chemical_id))]
    pub async fn update(
        &self,
        chemical_id: i32,
        request: UpdateChemicalRequest,
        actor_id: i32,
    ) -> Result<chemical::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let updated = db
            .transaction::<_, chemical::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let model = ChemicalEntity::find_by_id(chemical_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Chemical {}", chemical_id))
                        })?;

                    if let Some(cas_number) = &request.cas_number {
                        if model.cas_number.as_ref() != Some(cas_number) {
                            let taken = ChemicalEntity::find()
                                .filter(chemical::Column::CasNumber.eq(cas_number.clone()))
                                .filter(chemical::Column::Id.ne(chemical_id))
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                            if taken.is_some() {
                                return Err(ServiceError::Conflict(format!(
                                    "Chemical with CAS number {} already exists",
                                    cas_number
                                )));
                            }
                        }
                    }

                    let now = Utc::now();
                    let mut active: chemical::ActiveModel = model.clone().into();
                    let mut audits: Vec<chemical_audit::ActiveModel> = Vec::new();

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

                    if let Some(cas_number) = &request.cas_number {
                        if model.cas_number.as_ref() != Some(cas_number) {
                            audits.push(audit_row(
                                model.id,
                                actor_id,
                                "cas_number",
                                model.cas_number.clone().unwrap_or_default(),
                                cas_number.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.cas_number = Set(Some(cas_number.clone()));
                        }
                    }

                    if let Some(formula) = &request.formula {
                        if model.formula.as_ref() != Some(formula) {
                            audits.push(audit_row(
                                model.id,
                                actor_id,
                                "formula",
                                model.formula.clone().unwrap_or_default(),
                                formula.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.formula = Set(Some(formula.clone()));
                        }
                    }

                    if let Some(molecular_weight) = request.molecular_weight {
                        if model.molecular_weight != Some(molecular_weight) {
                            audits.push(audit_row(
                                model.id,
                                actor_id,
                                "molecular_weight",
                                model
                                    .molecular_weight
                                    .map(|w| w.to_string())
                                    .unwrap_or_default(),
                                molecular_weight.to_string(),
                                AuditAction::Update,
                                now,
                            ));
                            active.molecular_weight = Set(Some(molecular_weight));
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

                    if let Some(hazard_information) = &request.hazard_information {
                        if model.hazard_information.as_ref() != Some(hazard_information) {
                            audits.push(audit_row(
                                model.id,
                                actor_id,
                                "hazard_information",
                                model.hazard_information.clone().unwrap_or_default(),
                                hazard_information.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.hazard_information = Set(Some(hazard_information.clone()));
                        }
                    }

                    if let Some(storage_conditions) = &request.storage_conditions {
                        if model.storage_conditions.as_ref() != Some(storage_conditions) {
                            audits.push(audit_row(
                                model.id,
                                actor_id,
                                "storage_conditions",
                                model.storage_conditions.clone().unwrap_or_default(),
                                storage_conditions.clone(),
                                AuditAction::Update,
                                now,
                            ));
                            active.storage_conditions = Set(Some(storage_conditions.clone()));
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

        info!(chemical_id = updated.id, "Chemical updated");
        Ok(updated)
    }

    /// Deletes a chemical. Rejected with `Conflict` while inventory items
    /// still reference it; otherwise a DELETE audit row survives the entity.
    #[instrument(skip(self))]
    pub async fn delete(&self, chemical_id: i32, actor_id: i32) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let model = ChemicalEntity::find_by_id(chemical_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| ServiceError::NotFound(format!("Chemical {}", chemical_id)))?;

                let in_use = InventoryItemEntity::find()
                    .filter(inventory_item::Column::ChemicalId.eq(chemical_id))
                    .count(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if in_use > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "Cannot delete chemical {} while it is used in inventory",
                        chemical_id
                    )));
                }

                audit_row(
                    model.id,
                    actor_id,
                    "chemical",
                    model.name.clone(),
                    String::new(),
                    AuditAction::Delete,
                    Utc::now(),
                )
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?;

                model.delete(txn).await.map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await
        .map_err(unwrap_txn_err)?;

        info!(chemical_id, "Chemical deleted");
        Ok(())
    }
}

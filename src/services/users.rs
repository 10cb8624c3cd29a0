//! User account reads and updates.
//!
//! Registration and credential checks live in [`crate::auth::AuthService`];
//! this service covers the profile surface and admin account management.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    auth::AuthService,
    db::DbPool,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    ws::{Action, Resource},
};

const DEFAULT_PAGE_LIMIT: u64 = 100;
const MAX_PAGE_LIMIT: u64 = 500;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListUsersQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct UsersService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    auth: Arc<AuthService>,
}

impl UsersService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, auth: Arc<AuthService>) -> Self {
        Self {
            db_pool,
            event_sender,
            auth,
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: i32) -> Result<user::Model, ServiceError> {
        UserEntity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {}", user_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: ListUsersQuery,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);

        let select = UserEntity::find();
        let total = select
            .clone()
            .count(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let users = select
            .order_by_asc(user::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((users, total))
    }

    /// Updates the caller's own profile. Email uniqueness is re-checked.
    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        user_id: i32,
        request: UpdateProfileRequest,
    ) -> Result<user::Model, ServiceError> {
        let updated = self
            .apply_update(
                user_id,
                request.email,
                request.full_name,
                request.password,
                None,
                None,
            )
            .await?;
        self.notify(Action::Update, &updated).await;
        Ok(updated)
    }

    /// Admin-level account update; can also toggle active/admin flags.
    #[instrument(skip(self, request))]
    pub async fn admin_update(
        &self,
        user_id: i32,
        request: AdminUpdateUserRequest,
    ) -> Result<user::Model, ServiceError> {
        let updated = self
            .apply_update(
                user_id,
                request.email,
                request.full_name,
                request.password,
                request.is_active,
                request.is_admin,
            )
            .await?;
        self.notify(Action::Update, &updated).await;
        Ok(updated)
    }

    async fn apply_update(
        &self,
        user_id: i32,
        email: Option<String>,
        full_name: Option<String>,
        password: Option<String>,
        is_active: Option<bool>,
        is_admin: Option<bool>,
    ) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;

        let model = UserEntity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {}", user_id)))?;

        if let Some(email) = &email {
            if email != &model.email {
                let taken = UserEntity::find()
                    .filter(user::Column::Email.eq(email.clone()))
                    .filter(user::Column::Id.ne(user_id))
                    .one(db)
                    .await
                    .map_err(ServiceError::db_error)?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "User with email {} already exists",
                        email
                    )));
                }
            }
        }

        let mut active: user::ActiveModel = model.into();

        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(full_name) = full_name {
            active.full_name = Set(full_name);
        }
        if let Some(password) = password {
            active.hashed_password = Set(self.auth.hash_password(&password)?);
        }
        if let Some(is_active) = is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_admin) = is_admin {
            active.is_admin = Set(is_admin);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;
        info!(user_id = updated.id, "User account updated");
        Ok(updated)
    }

    async fn notify(&self, action: Action, account: &user::Model) {
        // hashed_password is #[serde(skip_serializing)] on the model, so the
        // fan-out payload never carries credentials
        let payload = serde_json::to_value(account).unwrap_or(json!(null));
        if let Err(e) = self
            .event_sender
            .send(Event::new(Resource::Users, action, payload))
            .await
        {
            warn!(error = %e, user_id = account.id, "Failed to queue user event");
        }
    }
}

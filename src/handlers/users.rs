use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::auth::{ActiveUser, AdminUser};
use crate::errors::ServiceError;
use crate::services::users::{AdminUpdateUserRequest, ListUsersQuery, UpdateProfileRequest};
use crate::{AppState, PaginatedResponse};

/// Create the users router
pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(read_me).put(update_me))
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user))
}

/// Current account details
pub async fn read_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.users.get(user.id).await?;
    Ok(Json(account))
}

/// Update the caller's own profile
pub async fn update_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.users.update_profile(user.id, payload).await?;
    Ok(Json(account))
}

/// List all accounts. Admin only.
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);
    let (items, total) = state.services.users.list(query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        skip,
        limit,
    }))
}

/// Get one account by id. Admin only.
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.users.get(id).await?;
    Ok(Json(account))
}

/// Update any account, including the active/admin flags. Admin only.
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.users.admin_update(id, payload).await?;
    Ok(Json(account))
}

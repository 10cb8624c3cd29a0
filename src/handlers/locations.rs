use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::auth::ActiveUser;
use crate::errors::ServiceError;
use crate::services::audit::LocationAuditQuery;
use crate::services::locations::{
    CreateLocationRequest, ListLocationsQuery, UpdateLocationRequest,
};
use crate::{AppState, PaginatedResponse};

/// Create the locations router
pub fn locations_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route("/audit-logs", get(list_audit_logs))
        .route(
            "/:id",
            get(get_location).put(update_location).delete(delete_location),
        )
        .route("/:id/audit-logs", get(list_audit_logs_for_location))
}

pub async fn create_location(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state.services.locations.create(payload, user.id).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn list_locations(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Query(query): Query<ListLocationsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);
    let (items, total) = state.services.locations.list(query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        skip,
        limit,
    }))
}

pub async fn get_location(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state.services.locations.get(id).await?;
    Ok(Json(location))
}

pub async fn update_location(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state.services.locations.update(id, payload, user.id).await?;
    Ok(Json(location))
}

pub async fn delete_location(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.locations.delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Query(query): Query<LocationAuditQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let audits = state.services.audit.list_location_audits(query).await?;
    Ok(Json(audits))
}

pub async fn list_audit_logs_for_location(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Path(id): Path<i32>,
    Query(mut query): Query<LocationAuditQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    // Verify the location exists so an unknown id is a 404, not an empty list
    state.services.locations.get(id).await?;
    query.location_id = Some(id);
    let audits = state.services.audit.list_location_audits(query).await?;
    Ok(Json(audits))
}

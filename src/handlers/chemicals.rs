use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::auth::ActiveUser;
use crate::errors::ServiceError;
use crate::services::audit::ChemicalAuditQuery;
use crate::services::chemicals::{
    CreateChemicalRequest, ListChemicalsQuery, UpdateChemicalRequest,
};
use crate::{AppState, PaginatedResponse};

/// Create the chemicals router
pub fn chemicals_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chemicals).post(create_chemical))
        .route("/audit-logs", get(list_audit_logs))
        .route(
            "/:id",
            get(get_chemical).put(update_chemical).delete(delete_chemical),
        )
}

pub async fn create_chemical(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<CreateChemicalRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let chemical = state.services.chemicals.create(payload, user.id).await?;
    Ok((StatusCode::CREATED, Json(chemical)))
}

pub async fn list_chemicals(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Query(query): Query<ListChemicalsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);
    let (items, total) = state.services.chemicals.list(query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        skip,
        limit,
    }))
}

pub async fn get_chemical(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let chemical = state.services.chemicals.get(id).await?;
    Ok(Json(chemical))
}

pub async fn update_chemical(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateChemicalRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let chemical = state.services.chemicals.update(id, payload, user.id).await?;
    Ok(Json(chemical))
}

pub async fn delete_chemical(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.chemicals.delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Query(query): Query<ChemicalAuditQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let audits = state.services.audit.list_chemical_audits(query).await?;
    Ok(Json(audits))
}

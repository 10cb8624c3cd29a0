use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::auth::{ActiveUser, AuthUser};
use crate::errors::ServiceError;
use crate::services::audit::InventoryAuditQuery;
use crate::services::ledger::{
    CreateItemRequest, InventoryItemResponse, ListChangesQuery, ListItemsQuery,
    RecordChangeRequest, UpdateItemRequest,
};
use crate::{AppState, PaginatedResponse};

/// Create the inventory router
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).put(update_item))
        .route("/changes", get(list_changes).post(record_change))
        .route("/audit", get(list_audit_logs))
}

/// Create a new inventory item
#[utoipa::path(
    post,
    path = "/api/v1/inventory/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Inventory item created", body = InventoryItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Chemical or location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.ledger.create_item(payload, user.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(InventoryItemResponse::from(item)),
    ))
}

/// List inventory items with optional filtering
#[utoipa::path(
    get,
    path = "/api/v1/inventory/items",
    responses(
        (status = 200, description = "Inventory items returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_items(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Query(query): Query<ListItemsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);
    let (items, total) = state.services.ledger.list_items(query).await?;

    let items: Vec<InventoryItemResponse> =
        items.into_iter().map(InventoryItemResponse::from).collect();

    Ok(Json(PaginatedResponse {
        items,
        total,
        skip,
        limit,
    }))
}

/// Get a specific inventory item
#[utoipa::path(
    get,
    path = "/api/v1/inventory/items/{id}",
    params(("id" = i32, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item returned", body = InventoryItemResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.ledger.get_item(id).await?;
    Ok(Json(InventoryItemResponse::from(item)))
}

/// Update an inventory item
#[utoipa::path(
    put,
    path = "/api/v1/inventory/items/{id}",
    params(("id" = i32, Path, description = "Inventory item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Inventory item updated", body = InventoryItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .ledger
        .update_item(id, payload, user.id)
        .await?;
    Ok(Json(InventoryItemResponse::from(item)))
}

/// Record an inventory change (consumption or addition)
///
/// Unlike the rest of the inventory surface this accepts any authenticated
/// caller, not only active accounts.
#[utoipa::path(
    post,
    path = "/api/v1/inventory/changes",
    request_body = RecordChangeRequest,
    responses(
        (status = 201, description = "Change recorded"),
        (status = 400, description = "Quantity would become negative", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or experiment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn record_change(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RecordChangeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (change, _item) = state
        .services
        .ledger
        .record_change(payload, user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(change)))
}

/// List inventory changes, newest first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/changes",
    responses(
        (status = 200, description = "Changes returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_changes(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Query(query): Query<ListChangesQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let changes = state.services.ledger.list_changes(query).await?;
    Ok(Json(changes))
}

/// List inventory audit records, newest first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/audit",
    responses(
        (status = 200, description = "Audit records returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    ActiveUser(_user): ActiveUser,
    Query(query): Query<InventoryAuditQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let audits = state.services.audit.list_inventory_audits(query).await?;
    Ok(Json(audits))
}

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::TokenPair;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::ws::{Action, Resource};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create the authentication router
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let account = state
        .auth
        .register(&payload.email, &payload.full_name, &payload.password)
        .await?;

    let event = Event::new(
        Resource::Users,
        Action::Create,
        serde_json::to_value(&account).unwrap_or(json!(null)),
    );
    if let Err(e) = state.event_sender.send(event).await {
        warn!(error = %e, user_id = account.id, "Failed to queue user event");
    }

    Ok((StatusCode::CREATED, Json(account)))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenPair),
        (status = 401, description = "Incorrect email or password", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (_account, tokens) = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(tokens))
}

//! Authentication and access control.
//!
//! JWT bearer tokens backed by the `users` table. The middleware validates
//! the token, loads the account, and stashes an [`AuthUser`] in the request
//! extensions; handlers pick their access level through the [`AuthUser`],
//! [`ActiveUser`] and [`AdminUser`] extractors.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::user::{self, Entity as UserEntity};
use crate::errors::ServiceError;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated account data carried through the request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub is_admin: bool,
}

impl From<user::Model> for AuthUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            is_active: model.is_active,
            is_admin: model.is_admin,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            access_token_expiration,
        }
    }
}

/// Issued token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Issues and validates tokens and resolves them back to accounts.
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        Self { config, db }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::InternalError(format!("Password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, hash: &str, password: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Creates a new account. Fails with `Conflict` when the email is taken.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let db = &*self.db;

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "User with email {} already exists",
                email
            )));
        }

        let account = user::ActiveModel {
            email: Set(email.to_string()),
            full_name: Set(full_name.to_string()),
            hashed_password: Set(self.hash_password(password)?),
            is_active: Set(true),
            is_admin: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        };

        let model = account.insert(db).await.map_err(ServiceError::db_error)?;
        debug!(user_id = model.id, "Account registered");
        Ok(model)
    }

    /// Verifies credentials and issues a token.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(user::Model, TokenPair), ServiceError> {
        let db = &*self.db;

        let account = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::Unauthorized("Incorrect email or password".into()))?;

        if !self.verify_password(&account.hashed_password, password) {
            return Err(ServiceError::Unauthorized(
                "Incorrect email or password".into(),
            ));
        }

        let tokens = self.generate_token(&account)?;
        Ok((account, tokens))
    }

    pub fn generate_token(&self, account: &user::Model) -> Result<TokenPair, ServiceError> {
        let now = Utc::now().timestamp();
        let expires_in = self.config.access_token_expiration.as_secs();
        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expires_in as i64,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("Token encoding failed: {}", e)))?;

        Ok(TokenPair {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthorized("Invalid or expired token".into()))
    }

    /// Resolves a bearer token to the account it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<user::Model, ServiceError> {
        let claims = self.validate_token(token)?;
        let user_id: i32 = claims
            .sub
            .parse()
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".into()))?;

        UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".into()))
    }
}

/// Authentication middleware that validates the bearer token and attaches
/// the resolved account to the request.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    let token = match token {
        Some(token) => token,
        None => {
            return ServiceError::Unauthorized("Missing bearer token".into()).into_response();
        }
    };

    match auth_service.authenticate(token).await {
        Ok(account) => {
            request.extensions_mut().insert(AuthUser::from(account));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))
    }
}

/// Extractor for endpoints restricted to active accounts.
#[derive(Debug, Clone)]
pub struct ActiveUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for ActiveUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_active {
            return Err(ServiceError::Forbidden("Inactive user".into()));
        }
        Ok(ActiveUser(user))
    }
}

/// Extractor for endpoints restricted to administrators.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ActiveUser(user) = ActiveUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ServiceError::Forbidden(
                "Administrator privileges required".into(),
            ));
        }
        Ok(AdminUser(user))
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        // The db handle is unused by the token/hash paths under test
        let db = Arc::new(DbPool::default());
        AuthService::new(
            AuthConfig::new("test-secret-key-0123456789abcdef".into(), Duration::from_secs(3600)),
            db,
        )
    }

    fn account() -> user::Model {
        user::Model {
            id: 7,
            email: "analyst@lab.test".into(),
            full_name: "Lab Analyst".into(),
            hashed_password: String::new(),
            is_active: true,
            is_admin: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let svc = service();
        let hash = svc.hash_password("hunter2hunter2").expect("hash");
        assert!(svc.verify_password(&hash, "hunter2hunter2"));
        assert!(!svc.verify_password(&hash, "wrong-password"));
    }

    #[test]
    fn token_round_trip_preserves_subject() {
        let svc = service();
        let tokens = svc.generate_token(&account()).expect("token");
        assert_eq!(tokens.token_type, "bearer");

        let claims = svc.validate_token(&tokens.access_token).expect("claims");
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "analyst@lab.test");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let tokens = svc.generate_token(&account()).expect("token");
        let mut tampered = tokens.access_token;
        tampered.push('x');
        assert!(svc.validate_token(&tampered).is_err());
    }
}

//! Authentication and authorization: argon2 password hashing, HS256 JWT
//! issuance/verification, and the axum middleware that turns a bearer token
//! into an [`AuthUser`] request extension.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::user::{self, UserRole},
    entities::User,
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user ID)
    pub email: String,
    pub role: String, // "customer" | "admin"
    pub jti: String,  // Unique identifier for this token
    pub iat: i64,     // Issued at time
    pub exp: i64,     // Expiration time
    pub iss: String,  // Issuer
}

/// Authenticated user data resolved from a verified bearer token
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[axum::async_trait]
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
            .ok_or_else(|| ServiceError::Unauthorized("Access token required".to_string()))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            token_expiration,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("Password hashing failed: {0}")]
    HashError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::InvalidCredentials => ServiceError::Unauthorized(err.to_string()),
            AuthError::TokenCreation(msg) | AuthError::HashError(msg) => {
                ServiceError::InternalError(msg)
            }
        }
    }
}

/// Input for account registration (field validation happens at the handler)
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Input for login
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Authentication service handling account creation, credential
/// verification, and token issuance/validation.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            config,
            db,
            event_sender,
        }
    }

    /// Registers a new account and returns it with a freshly issued token.
    ///
    /// Duplicate email or username fails with `Conflict`.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<(user::Model, String), ServiceError> {
        let existing = User::find()
            .filter(user::Column::Email.eq(input.email.as_str()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let username = input.username.to_lowercase();
        let existing_username = User::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .one(&*self.db)
            .await?;
        if existing_username.is_some() {
            return Err(ServiceError::Conflict("Username already taken".to_string()));
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            email: Set(input.email),
            password_hash: Set(Self::hash_password(&input.password)?),
            phone: Set(input.phone),
            role: Set(UserRole::Customer),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await?;
        let token = self.generate_token(&created)?;

        self.event_sender
            .send_or_log(Event::UserRegistered(created.id))
            .await;

        info!(user_id = %created.id, "User registered");
        Ok((created, token))
    }

    /// Verifies credentials and returns the user with a fresh token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<(user::Model, String), ServiceError> {
        let user = User::find()
            .filter(user::Column::Email.eq(input.email.as_str()))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(&input.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.generate_token(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let expiry = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: match user.role {
                UserRole::Admin => "admin".to_string(),
                UserRole::Customer => "customer".to_string(),
            },
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }

    /// Resolves a verified token into the current account. The account must
    /// still exist; tokens for deleted users are rejected.
    pub async fn resolve_user(&self, claims: &Claims) -> Result<user::Model, ServiceError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User not found".to_string()))
    }

    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Middleware: verify the bearer token and attach [`AuthUser`] to the request.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    let claims = auth.validate_token(token)?;
    let user = auth.resolve_user(&claims).await?;

    let auth_user = AuthUser {
        user_id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
    };
    req.extensions_mut().insert(auth_user);

    Ok(next.run(req).await)
}

/// Middleware: require the `admin` role. Must run after [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ServiceError> {
    let auth_user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthorized("Access token required".to_string()))?;

    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}

/// Ownership check for user-scoped resources; admins may act on any user.
pub fn ensure_owner(auth_user: &AuthUser, user_id: Uuid) -> Result<(), ServiceError> {
    if auth_user.user_id == user_id || auth_user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Cannot access another user's resources".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        AuthService::new(
            AuthConfig::new(
                "unit-test-signing-key-0123456789-abcdefghijklmnopqrstuvwxyz-0987654321".into(),
                "bloomshop-api".into(),
                Duration::from_secs(3600),
            ),
            Arc::new(DatabaseConnection::Disconnected),
            EventSender::new(tx),
        )
    }

    fn test_user() -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::new_v4(),
            username: "daisy".into(),
            email: "daisy@example.com".into(),
            password_hash: String::new(),
            phone: None,
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = AuthService::hash_password("tulips-4ever").unwrap();
        assert_ne!(hash, "tulips-4ever");
        assert!(AuthService::verify_password("tulips-4ever", &hash).unwrap());
        assert!(!AuthService::verify_password("roses-4ever", &hash).unwrap());
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        let service = test_service();
        let user = test_user();

        let token = service.generate_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, "customer");
        assert_eq!(claims.iss, "bloomshop-api");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = test_service();
        let user = test_user();

        let mut token = service.generate_token(&user).unwrap();
        token.push('x');

        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = test_service();
        let user = test_user();

        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: "customer".into(),
            jti: Uuid::new_v4().to_string(),
            iat: (now - ChronoDuration::hours(2)).timestamp(),
            exp: (now - ChronoDuration::hours(1)).timestamp(),
            iss: "bloomshop-api".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(
                "unit-test-signing-key-0123456789-abcdefghijklmnopqrstuvwxyz-0987654321".as_bytes(),
            ),
        )
        .unwrap();

        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn ownership_check_allows_self_and_admin() {
        let user_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();

        let customer = AuthUser {
            user_id,
            username: "daisy".into(),
            email: "daisy@example.com".into(),
            role: UserRole::Customer,
        };
        assert!(ensure_owner(&customer, user_id).is_ok());
        assert!(ensure_owner(&customer, other_id).is_err());

        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            username: "root".into(),
            email: "root@example.com".into(),
            role: UserRole::Admin,
        };
        assert!(ensure_owner(&admin, other_id).is_ok());
    }
}

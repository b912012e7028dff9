use crate::auth::{require_auth, AuthService, AuthUser, LoginInput, RegisterInput};
use crate::errors::ServiceError;
use crate::handlers::common::{success_response, validate_input};
use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for authentication endpoints
pub fn auth_routes(auth_service: Arc<AuthService>) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            auth_service.clone(),
            require_auth,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
        .with_state(auth_service)
}

async fn register(
    axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let (_, token) = auth
        .register(RegisterInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            phone: payload.phone,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            success: true,
            message: "User registered successfully".to_string(),
            token,
        }),
    ))
}

async fn login(
    axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let (_, token) = auth
        .login(LoginInput {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(Json(TokenResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
    }))
}

async fn me(auth_user: AuthUser) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(serde_json::json!({ "user": auth_user })))
}

/// Stateless JWTs are discarded client-side; the endpoint exists so clients
/// have a uniform logout call to hit.
async fn logout(_auth_user: AuthUser) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

//! Bloomshop API Library
//!
//! REST backend for the Bloomshop flower store: catalog, per-user carts,
//! shipping addresses, transactional checkout, and admin order management.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{extract::State, middleware, response::Json, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{require_admin, require_auth, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Assembles the `/api` router.
///
/// Three auth tiers: public catalog reads, user-scoped routes behind
/// `require_auth`, and admin routes additionally behind `require_admin`.
pub fn api_routes(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let public = Router::new()
        .nest("/flowers", handlers::flowers::flowers_routes())
        .with_state(state.clone());

    let user_scoped = Router::new()
        .nest("/cart", handlers::carts::carts_routes())
        .nest("/shipping-address", handlers::addresses::addresses_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .route_layer(middleware::from_fn_with_state(
            auth_service.clone(),
            require_auth,
        ))
        .with_state(state.clone());

    // route_layer added later runs first: require_auth resolves the user
    // before require_admin inspects the role.
    let admin = Router::new()
        .nest("/admin", handlers::admin::admin_routes())
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            auth_service.clone(),
            require_auth,
        ))
        .with_state(state);

    Router::new()
        .nest("/auth", handlers::auth::auth_routes(auth_service))
        .merge(public)
        .merge(user_scoped)
        .merge(admin)
}

/// Liveness/readiness probe: verifies database connectivity.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

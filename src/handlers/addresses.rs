use crate::auth::{ensure_owner, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::common::{no_content_response, success_message_response, success_response, validate_input};
use crate::services::addresses::CreateAddressInput;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for shipping-address endpoints. The `:id` segment is
/// the owning user for GET and the address for DELETE, as the storefront
/// client expects.
pub fn addresses_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_shipping_address))
        .route("/:id", get(get_shipping_addresses))
        .route("/address-labels/:id", get(get_address_labels))
        .route("/:id", delete(delete_shipping_address))
}

async fn get_shipping_addresses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_owner(&auth_user, user_id)?;

    let addresses = state.services.addresses.list(user_id).await?;
    Ok(success_response(addresses))
}

/// Address picker view: everything but postal code and timestamps
async fn get_address_labels(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_owner(&auth_user, user_id)?;

    let labels = state.services.addresses.labels(user_id).await?;
    Ok(success_response(labels))
}

async fn create_shipping_address(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateAddressRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    ensure_owner(&auth_user, payload.user_id)?;

    let address = state
        .services
        .addresses
        .create(
            payload.user_id,
            CreateAddressInput {
                street: payload.street,
                city: payload.city,
                commune: payload.commune,
                province: payload.province,
                postal_code: payload.postal_code,
                country: payload.country,
                label: payload.label,
            },
        )
        .await?;

    Ok(success_message_response(
        address,
        "Shipping Address Created Successfully",
    ))
}

/// Deletes an address the caller owns; a foreign or unknown id is a 404.
async fn delete_shipping_address(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.addresses.delete(auth_user.user_id, id).await?;
    Ok(no_content_response())
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAddressRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Street is required"))]
    pub street: String,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "Commune is required"))]
    pub commune: String,
    #[validate(length(min = 1, max = 100, message = "Province is required"))]
    pub province: String,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 50))]
    pub label: Option<String>,
}

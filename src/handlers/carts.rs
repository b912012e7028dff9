use crate::auth::{ensure_owner, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::common::{no_content_response, success_message_response, success_response, validate_input};
use crate::services::cart::AddToCartInput;
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

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(add_to_cart))
        .route("/:user_id", get(get_cart_items))
        .route("/cart-quantity/:user_id", get(get_cart_quantity))
        .route("/:user_id/items/:flower_id", delete(remove_cart_item))
}

/// Add a flower to the cart; a repeated add merges quantity
async fn add_to_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    ensure_owner(&auth_user, payload.user_id)?;

    let item = state
        .services
        .cart
        .add_item(
            payload.user_id,
            AddToCartInput {
                flower_id: payload.flower_id,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok(success_message_response(
        item,
        "Flower added to cart successfully",
    ))
}

/// Cart rows joined with their catalog records
async fn get_cart_items(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_owner(&auth_user, user_id)?;

    let items = state.services.cart.list_items(user_id).await?;
    Ok(success_response(items))
}

/// Number of cart rows (storefront badge)
async fn get_cart_quantity(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_owner(&auth_user, user_id)?;

    let count = state.services.cart.item_count(user_id).await?;
    Ok(success_response(count))
}

/// Remove one (user, flower) row
async fn remove_cart_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((user_id, flower_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_owner(&auth_user, user_id)?;

    state.services.cart.remove_item(user_id, flower_id).await?;
    Ok(no_content_response())
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub user_id: Uuid,
    pub flower_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

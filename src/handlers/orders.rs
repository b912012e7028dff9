use crate::auth::{ensure_owner, AuthUser};
use crate::entities::order::PaymentMethod;
use crate::errors::ServiceError;
use crate::handlers::common::{success_response, validate_input};
use crate::services::orders::{CheckoutLine, CreateOrderInput};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for storefront order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/:user_id", get(get_orders))
        .route("/recent-order/:user_id", get(get_recent_orders))
}

/// Checkout: turn the stored cart into an order
#[utoipa::path(
    post,
    path = "/api/orders",
    summary = "Create order",
    description = "Creates an order from the user's stored cart, computes totals server-side, and clears the cart. All writes are one atomic transaction.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = CreateOrderResponse),
        (status = 400, description = "Empty cart or invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipping address not owned by user", body = crate::errors::ErrorResponse),
        (status = 409, description = "Cart already checked out", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    ensure_owner(&auth_user, payload.user_id)?;

    let order = state
        .services
        .orders
        .create_order(
            payload.user_id,
            CreateOrderInput {
                shipping_address_id: payload.shipping_address_id,
                payment_method: payload.payment_method.unwrap_or(PaymentMethod::QrCode),
                cart_items: payload.cart_items,
                total_price: payload.total_price,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            success: true,
            message: "Order created successfully".to_string(),
            order_id: order.id,
        }),
    ))
}

/// Non-cancelled orders of the user with line items and address
#[utoipa::path(
    get,
    path = "/api/orders/{user_id}",
    summary = "List orders",
    params(("user_id" = Uuid, Path, description = "Owner of the orders")),
    responses(
        (status = 200, description = "Orders retrieved successfully"),
        (status = 403, description = "Not the caller's orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_owner(&auth_user, user_id)?;

    let orders = state.services.orders.list_orders(user_id).await?;
    Ok(success_response(orders))
}

/// The five most recent non-cancelled orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders/recent-order/{user_id}",
    summary = "Recent orders",
    params(("user_id" = Uuid, Path, description = "Owner of the orders")),
    responses(
        (status = 200, description = "Orders retrieved successfully"),
        (status = 403, description = "Not the caller's orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_recent_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_owner(&auth_user, user_id)?;

    let orders = state.services.orders.recent_orders(user_id).await?;
    Ok(success_response(orders))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    /// Defaults to qr_code, the storefront's primary payment flow.
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(min = 1, message = "Cart must not be empty"))]
    pub cart_items: Vec<CheckoutLine>,
    /// Client-side subtotal; accepted but recomputed server-side.
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub message: String,
    pub order_id: Uuid,
}

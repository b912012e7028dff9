use crate::entities::flower::FlowerCategory;
use crate::entities::order::{OrderStatus, PaymentStatus};
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_message_response, success_response, validate_input,
};
use crate::services::catalog::{CreateFlowerInput, UpdateFlowerInput};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for admin endpoints. Auth and role checks are layered
/// on by the caller (`require_auth` + `require_admin`).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(get_all_orders))
        .route("/orders/:id/items", get(get_order_items))
        .route("/orders/:id/status", put(update_order_status))
        .route("/orders/:id/payment-status", put(update_payment_status))
        .route("/flowers", get(get_all_flowers))
        .route("/flowers", post(add_flower))
        .route("/flowers/:id", put(update_flower))
        .route("/flowers/:id", delete(delete_flower))
}

/// Every order with owner and address summaries
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    summary = "List all orders",
    responses(
        (status = 200, description = "Orders retrieved successfully"),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_all_orders(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.orders.list_all_orders().await?;
    Ok(success_response(orders))
}

/// Line items of one order
#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}/items",
    summary = "Order line items",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Items retrieved successfully"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.orders.order_items(id).await?;
    Ok(success_response(items))
}

/// Set the order status; any transition is accepted
#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    summary = "Update order status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated successfully"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .set_order_status(id, payload.status)
        .await?;
    Ok(success_message_response(
        order,
        "Order status updated successfully",
    ))
}

/// Set the payment status; any transition is accepted
#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/payment-status",
    summary = "Update payment status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated successfully"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .set_payment_status(id, payload.payment_status)
        .await?;
    Ok(success_message_response(
        order,
        "Payment status updated successfully",
    ))
}

async fn get_all_flowers(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let flowers = state.services.catalog.list_flowers().await?;
    Ok(success_response(flowers))
}

async fn add_flower(
    State(state): State<AppState>,
    Json(payload): Json<FlowerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let flower = state
        .services
        .catalog
        .create_flower(CreateFlowerInput {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            stock: payload.stock,
            image: payload.image,
            category: payload.category,
        })
        .await?;

    Ok(created_response(flower))
}

async fn update_flower(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FlowerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let flower = state
        .services
        .catalog
        .update_flower(
            id,
            UpdateFlowerInput {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                stock: payload.stock,
                image: payload.image,
                category: payload.category,
            },
        )
        .await?;

    Ok(success_response(flower))
}

async fn delete_flower(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_flower(id).await?;
    Ok(success_response(serde_json::json!({
        "message": "Flower deleted successfully"
    })))
}

// Request DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

/// Create/update payload for a catalog entry. Price and stock bounds are
/// enforced by the catalog service.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FlowerRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    #[validate(length(max = 500))]
    pub image: Option<String>,
    pub category: FlowerCategory,
}

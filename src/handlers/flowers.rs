use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

/// Creates the router for public catalog endpoints
pub fn flowers_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_flowers))
        .route("/:id", get(get_flower))
}

/// Browse the whole catalog
async fn list_flowers(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let flowers = state.services.catalog.list_flowers().await?;
    Ok(success_response(flowers))
}

/// Single flower detail page
async fn get_flower(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let flower = state.services.catalog.get_flower(id).await?;
    Ok(success_response(flower))
}

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod carts;
pub mod common;
pub mod flowers;
pub mod orders;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{AddressService, CartService, CatalogService, OrderService},
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub addresses: Arc<AddressService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone(), event_sender.clone())),
            cart: Arc::new(CartService::new(db_pool.clone(), event_sender.clone())),
            addresses: Arc::new(AddressService::new(db_pool.clone(), event_sender.clone())),
            orders: Arc::new(OrderService::new(db_pool, event_sender, config)),
        }
    }
}

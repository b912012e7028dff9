use crate::{
    entities::{cart_item, flower},
    entities::{CartItem, Flower},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-user shopping cart over (user, flower) rows.
///
/// The unit price is captured from the catalog at add time, so a later
/// catalog price change does not reprice a cart that is already filled.
/// Checkout consumes the rows wholesale (see `OrderService::create_order`).
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub flower_id: Uuid,
    pub quantity: i32,
}

/// A cart row joined with its current catalog record
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub item: cart_item::Model,
    pub flower: Option<flower::Model>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Adds a flower to the cart, merging quantity into the existing
    /// (user, flower) row when one exists.
    ///
    /// The captured unit price of an existing row is kept; only the first
    /// add snapshots the catalog price.
    #[instrument(skip(self), fields(user_id = %user_id, flower_id = %input.flower_id))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<cart_item::Model, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let flower = Flower::find_by_id(input.flower_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Flower {} not found", input.flower_id))
            })?;

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::FlowerId.eq(input.flower_id))
            .one(&txn)
            .await?;

        let row = if let Some(item) = existing {
            let merged_quantity = item.quantity + input.quantity;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(merged_quantity);
            item.update(&txn).await?
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                flower_id: Set(input.flower_id),
                quantity: Set(input.quantity),
                unit_price: Set(flower.price),
                added_at: Set(Utc::now()),
            };
            item.insert(&txn).await?
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                flower_id: input.flower_id,
            })
            .await;

        info!(
            "Added flower {} x{} to cart of user {}",
            input.flower_id, input.quantity, user_id
        );
        Ok(row)
    }

    /// Returns the user's cart rows joined with their catalog records.
    pub async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartLine>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(Flower)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(item, flower)| CartLine { item, flower })
            .collect())
    }

    /// Number of distinct cart rows (the badge count in the storefront).
    pub async fn item_count(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await?)
    }

    /// Removes a single (user, flower) row.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, flower_id: Uuid) -> Result<(), ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::FlowerId.eq(flower_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Flower {} is not in the cart",
                flower_id
            )));
        }

        self.event_sender
            .send_or_log(Event::CartItemRemoved { user_id, flower_id })
            .await;

        Ok(())
    }

    /// Deletes every cart row of the user; returns how many were removed.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected > 0 {
            self.event_sender
                .send_or_log(Event::CartCleared(user_id))
                .await;
        }

        info!("Cleared cart of user {}: {} rows", user_id, result.rows_affected);
        Ok(result.rows_affected)
    }
}

/// Subtotal of a set of cart rows using their captured unit prices.
pub fn cart_subtotal(rows: &[cart_item::Model]) -> Decimal {
    rows.iter()
        .map(|row| row.unit_price * Decimal::from(row.quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(quantity: i32, unit_price: Decimal) -> cart_item::Model {
        cart_item::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            flower_id: Uuid::new_v4(),
            quantity,
            unit_price,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn subtotal_sums_captured_prices() {
        let rows = vec![row(2, dec!(10.00)), row(1, dec!(5.00))];
        assert_eq!(cart_subtotal(&rows), dec!(25.00));
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() {
        assert_eq!(cart_subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn subtotal_keeps_cents_precision() {
        let rows = vec![row(3, dec!(19.99)), row(2, dec!(0.01))];
        assert_eq!(cart_subtotal(&rows), dec!(59.99));
    }
}

use crate::{
    config::AppConfig,
    entities::order::{self, OrderStatus, PaymentMethod, PaymentStatus},
    entities::{cart_item, flower, order_item, shipping_address, user},
    entities::{CartItem, Flower, Order, OrderItem, ShippingAddress, User},
    errors::ServiceError,
    events::{Event, EventSender},
    services::cart::cart_subtotal,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// How many orders the storefront's "recent orders" widget shows.
const RECENT_ORDERS_LIMIT: u64 = 5;

/// The order engine: turns a cart into an immutable order with line items,
/// plus the order queries and the admin status transitions.
///
/// Checkout runs as one transaction: the order row, its line items, and the
/// cart clearing either all commit or none do. The client-submitted totals
/// are ignored; the subtotal is recomputed from the stored cart rows.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    shipping_fee: Decimal,
    tax_rate: Decimal,
}

/// One client-side cart line as submitted at checkout. Carried for wire
/// compatibility; the engine re-reads the cart from storage instead.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutLine {
    pub flower_id: Uuid,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

/// Input for creating an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub shipping_address_id: Uuid,
    pub payment_method: PaymentMethod,
    pub cart_items: Vec<CheckoutLine>,
    pub total_price: Option<Decimal>,
}

/// Derived monetary amounts of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Order line joined with its flower snapshot
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineDetail {
    pub item: order_item::Model,
    pub flower: Option<flower::Model>,
}

/// An order with its line items and shipping address
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetails {
    pub order: order::Model,
    pub items: Vec<OrderLineDetail>,
    pub shipping_address: Option<shipping_address::Model>,
}

/// Slim user projection for the admin order table
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// An order with owner and destination summaries (admin listing)
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderDetails {
    pub order: order::Model,
    pub user: Option<UserSummary>,
    pub shipping_address: Option<shipping_address::Model>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, config: &AppConfig) -> Self {
        let shipping_fee = Decimal::from_f64_retain(config.shipping_fee)
            .unwrap_or_default()
            .round_dp(2);
        let tax_rate = Decimal::from_f64_retain(config.tax_rate)
            .unwrap_or_default()
            .round_dp(4);

        Self {
            db,
            event_sender,
            shipping_fee,
            tax_rate,
        }
    }

    /// Derives shipping fee, tax, and grand total from a subtotal.
    /// Tax is rounded to cents so repeated aggregation cannot drift.
    pub fn compute_totals(&self, subtotal: Decimal) -> OrderTotals {
        let tax = (subtotal * self.tax_rate).round_dp(2);
        OrderTotals {
            subtotal,
            shipping_fee: self.shipping_fee,
            tax,
            total: subtotal + self.shipping_fee + tax,
        }
    }

    /// Creates an order from the user's stored cart.
    ///
    /// All three side effects (order insert, line-item inserts, cart clear)
    /// happen inside a single transaction. If the cart was concurrently
    /// consumed by another checkout the transaction is abandoned with
    /// `Conflict` instead of committing a second order.
    #[instrument(skip(self, input), fields(user_id = %user_id, address_id = %input.shipping_address_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<order::Model, ServiceError> {
        if input.cart_items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Cannot create an order from an empty cart".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        // The stored cart is authoritative; the submitted lines are not.
        let cart_rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .all(&txn)
            .await?;

        if cart_rows.is_empty() {
            return Err(ServiceError::ValidationError(
                "Cannot create an order from an empty cart".to_string(),
            ));
        }

        let address = ShippingAddress::find_by_id(input.shipping_address_id)
            .one(&txn)
            .await?
            .filter(|address| address.user_id == user_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Shipping address {} not found",
                    input.shipping_address_id
                ))
            })?;

        let subtotal = cart_subtotal(&cart_rows);
        if subtotal <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Order subtotal must be positive".to_string(),
            ));
        }

        if let Some(client_total) = input.total_price {
            if client_total != subtotal {
                warn!(
                    client_subtotal = %client_total,
                    server_subtotal = %subtotal,
                    "Client-submitted subtotal differs from stored cart; using server value"
                );
            }
        }

        let totals = self.compute_totals(subtotal);
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let order_model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            shipping_address_id: Set(address.id),
            payment_method: Set(input.payment_method),
            payment_status: Set(PaymentStatus::Pending),
            order_status: Set(OrderStatus::Processing),
            subtotal: Set(totals.subtotal),
            shipping_fee: Set(totals.shipping_fee),
            tax: Set(totals.tax),
            total: Set(totals.total),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order_model.insert(&txn).await?;

        for row in &cart_rows {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                flower_id: Set(row.flower_id),
                quantity: Set(row.quantity),
                unit_price: Set(row.unit_price),
                total_price: Set(row.unit_price * Decimal::from(row.quantity)),
            };
            item.insert(&txn).await?;
        }

        // Checkout always empties the whole cart, not just the submitted
        // lines. Zero deleted rows means another checkout got here first.
        let deleted = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::Conflict(
                "Cart was already checked out".to_string(),
            ));
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        info!(
            order_id = %order_id,
            lines = cart_rows.len(),
            total = %totals.total,
            "Order created"
        );
        Ok(order)
    }

    /// Non-cancelled orders of a user, with line items and address.
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderDetails>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::OrderStatus.ne(OrderStatus::Cancelled))
            .all(&*self.db)
            .await?;

        self.attach_details(orders).await
    }

    /// The user's most recent non-cancelled orders, newest first, capped.
    pub async fn recent_orders(&self, user_id: Uuid) -> Result<Vec<OrderDetails>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::OrderStatus.ne(OrderStatus::Cancelled))
            .order_by_desc(order::Column::CreatedAt)
            .limit(RECENT_ORDERS_LIMIT)
            .all(&*self.db)
            .await?;

        self.attach_details(orders).await
    }

    /// Every order with owner and address summaries (admin view).
    pub async fn list_all_orders(&self) -> Result<Vec<AdminOrderDetails>, ServiceError> {
        let orders = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
        let users: HashMap<Uuid, user::Model> = User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let address_ids: Vec<Uuid> = orders.iter().map(|o| o.shipping_address_id).collect();
        let addresses: HashMap<Uuid, shipping_address::Model> = ShippingAddress::find()
            .filter(shipping_address::Column::Id.is_in(address_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let user = users.get(&order.user_id).map(|u| UserSummary {
                    id: u.id,
                    username: u.username.clone(),
                    email: u.email.clone(),
                });
                let shipping_address = addresses.get(&order.shipping_address_id).cloned();
                AdminOrderDetails {
                    order,
                    user,
                    shipping_address,
                }
            })
            .collect())
    }

    /// Line items of one order, joined with flower snapshots.
    pub async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderLineDetail>, ServiceError> {
        Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .find_also_related(Flower)
            .all(&*self.db)
            .await?;

        Ok(items
            .into_iter()
            .map(|(item, flower)| OrderLineDetail { item, flower })
            .collect())
    }

    /// Admin-only single-column update. Transitions are unrestricted by
    /// design; cancelling does not restock.
    #[instrument(skip(self))]
    pub async fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let old_status = order.order_status;
        let mut model: order::ActiveModel = order.into();
        model.order_status = Set(status);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_value(),
                new_status: status.to_value(),
            })
            .await;

        info!(order_id = %order_id, "Order status updated");
        Ok(updated)
    }

    /// Admin-only single-column update of the payment status.
    #[instrument(skip(self))]
    pub async fn set_payment_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let old_status = order.payment_status;
        let mut model: order::ActiveModel = order.into();
        model.payment_status = Set(status);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PaymentStatusChanged {
                order_id,
                old_status: old_status.to_value(),
                new_status: status.to_value(),
            })
            .await;

        info!(order_id = %order_id, "Payment status updated");
        Ok(updated)
    }

    /// Loads line items and addresses for a page of orders in two queries.
    async fn attach_details(
        &self,
        orders: Vec<order::Model>,
    ) -> Result<Vec<OrderDetails>, ServiceError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<OrderLineDetail>> = HashMap::new();
        let rows = OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .find_also_related(Flower)
            .all(&*self.db)
            .await?;
        for (item, flower) in rows {
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderLineDetail { item, flower });
        }

        let address_ids: Vec<Uuid> = orders.iter().map(|o| o.shipping_address_id).collect();
        let addresses: HashMap<Uuid, shipping_address::Model> = ShippingAddress::find()
            .filter(shipping_address::Column::Id.is_in(address_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                let shipping_address = addresses.get(&order.shipping_address_id).cloned();
                OrderDetails {
                    order,
                    items,
                    shipping_address,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn service() -> OrderService {
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "unit-test-signing-key-0123456789-abcdefghijklmnopqrstuvwxyz-0987654321".into(),
            3600,
            "127.0.0.1".into(),
            0,
            "test".into(),
        );
        OrderService::new(
            Arc::new(DatabaseConnection::Disconnected),
            EventSender::new(tx),
            &cfg,
        )
    }

    #[test]
    fn totals_for_the_reference_cart() {
        // 2 x 10.00 + 1 x 5.00 => 25.00 / 5.99 / 2.00 / 32.99
        let totals = service().compute_totals(dec!(25.00));
        assert_eq!(totals.subtotal, dec!(25.00));
        assert_eq!(totals.shipping_fee, dec!(5.99));
        assert_eq!(totals.tax, dec!(2.00));
        assert_eq!(totals.total, dec!(32.99));
    }

    #[test]
    fn tax_is_rounded_to_cents() {
        let totals = service().compute_totals(dec!(19.99));
        // 19.99 * 0.08 = 1.5992 -> 1.60
        assert_eq!(totals.tax, dec!(1.60));
        assert_eq!(totals.total, dec!(19.99) + dec!(5.99) + dec!(1.60));
    }

    #[test]
    fn total_is_subtotal_plus_fee_plus_tax() {
        let svc = service();
        for subtotal in [dec!(0.01), dec!(9.50), dec!(120.00), dec!(999.99)] {
            let totals = svc.compute_totals(subtotal);
            assert_eq!(
                totals.total,
                totals.subtotal + totals.shipping_fee + totals.tax
            );
            assert_eq!(totals.tax, (subtotal * dec!(0.08)).round_dp(2));
        }
    }
}

//! Order workflow
//!
//! Placement snapshots catalog prices into order items; status changes walk
//! the transition table and are written with a compare-and-set on the
//! status they were decided from.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{reference_error, Paginated};
use crate::domain::aggregates::{Order, OrderStatus, PricedLine};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{Pagination, PaymentMethod, Quantity, ShippingAddress};
use crate::publisher::EventPublisher;
use crate::repository::{CartRepository, OrderQuery, OrderRepository, ProductRepository};
use crate::{Result, ShopError};

#[derive(Clone, Debug, Deserialize)]
pub struct OrderLineRequest {
    #[serde(default)]
    pub product_id: Uuid,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderFilter {
    /// Scopes the listing to one user; `None` lists every order.
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    carts: Arc<dyn CartRepository>,
    events: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        carts: Arc<dyn CartRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { orders, products, carts, events }
    }

    pub async fn create_order(&self, user_id: Uuid, req: CreateOrderRequest) -> Result<Order> {
        if user_id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        req.shipping_address.validate()?;
        let payment_method: PaymentMethod = req.payment_method.trim().parse()?;
        if req.items.is_empty() {
            return Err(ShopError::OrderMustContainItem);
        }

        let mut requested = Vec::with_capacity(req.items.len());
        for line in &req.items {
            if line.product_id.is_nil() {
                return Err(ShopError::ProductIdRequired);
            }
            requested.push((line.product_id, Quantity::new(line.quantity)?));
        }

        let mut lines = Vec::with_capacity(requested.len());
        for (product_id, quantity) in requested {
            let product = self.products.get_by_id(product_id).await?.ok_or(ShopError::ProductNotFound)?;
            lines.push(PricedLine { product_id, quantity, unit_price: product.price });
        }

        let order = Order::place(user_id, &lines, req.shipping_address, payment_method);
        self.orders.create(&order).await.map_err(reference_error)?;

        info!(order_id = %order.id, %user_id, total = %order.total_amount, items = order.items.len(), "order created");
        self.events
            .publish(
                OrderEvent::Created {
                    order_id: order.id,
                    user_id: order.user_id,
                    total: order.total_amount,
                    item_count: order.items.len(),
                }
                .into(),
            )
            .await;

        Ok(order)
    }

    /// Turns the user's cart into an order and takes the ordered rows off the
    /// cart. Anything added while the order was being placed stays in the cart.
    pub async fn checkout(&self, user_id: Uuid, req: CheckoutRequest) -> Result<Order> {
        if user_id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        let rows: Vec<_> = self.carts.list_with_products(user_id).await?.into_iter().map(|row| row.item).collect();
        let items = rows
            .iter()
            .map(|item| OrderLineRequest { product_id: item.product_id, quantity: item.quantity })
            .collect();

        let order = self
            .create_order(
                user_id,
                CreateOrderRequest { items, shipping_address: req.shipping_address, payment_method: req.payment_method },
            )
            .await?;

        if let Err(err) = self.carts.remove_checked_out(user_id, &rows).await {
            error!(order_id = %order.id, %user_id, error = %err, "order placed but cart was not cleared");
        }
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order> {
        if id.is_nil() {
            return Err(ShopError::OrderIdRequired);
        }
        self.orders.get_by_id(id).await?.ok_or(ShopError::OrderNotFound)
    }

    /// Same as [`get_order`](Self::get_order), but orders of other users read as missing.
    pub async fn get_order_for(&self, user_id: Uuid, id: Uuid) -> Result<Order> {
        let order = self.get_order(id).await?;
        if !order.belongs_to(user_id) {
            return Err(ShopError::OrderNotFound);
        }
        Ok(order)
    }

    pub async fn list_order(&self, filter: OrderFilter) -> Result<Paginated<Order>> {
        let status = match filter.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<OrderStatus>()?),
        };
        let page = Pagination::from_optional(filter.limit, filter.offset);
        let query = OrderQuery { user_id: filter.user_id, status, page };

        let result = self.orders.list(&query).await?;
        Ok(Paginated::new(result, page))
    }

    pub async fn update_order_status(&self, id: Uuid, status: &str) -> Result<Order> {
        if id.is_nil() {
            return Err(ShopError::OrderIdRequired);
        }
        let status = status.trim();
        if status.is_empty() {
            return Err(ShopError::StatusRequired);
        }
        let next: OrderStatus = status.parse()?;

        let mut order = self.get_order(id).await?;
        let current = order.status;
        let previous = order.transition_to(next).map_err(|err| {
            warn!(order_id = %id, from = %current, to = %next, error = %err, "status change rejected");
            err
        })?;
        self.commit_status(&order, previous).await?;
        Ok(order)
    }

    pub async fn cancel_order(&self, id: Uuid) -> Result<Order> {
        let mut order = self.get_order(id).await?;
        let previous = order.cancel()?;
        self.commit_status(&order, previous).await?;
        Ok(order)
    }

    async fn commit_status(&self, order: &Order, previous: OrderStatus) -> Result<()> {
        if !self.orders.update_status(order.id, previous, order.status).await? {
            warn!(order_id = %order.id, expected = %previous, "status changed underneath the update");
            return Err(ShopError::OrderStatusConflict);
        }

        info!(order_id = %order.id, from = %previous, to = %order.status, "order status changed");
        self.events
            .publish(OrderEvent::StatusChanged { order_id: order.id, from: previous, to: order.status }.into())
            .await;
        Ok(())
    }
}

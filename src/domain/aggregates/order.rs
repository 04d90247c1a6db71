//! Order Aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Money, PaymentMethod, Quantity, ShippingAddress};
use crate::ShopError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a placed order. `price` is the unit price at placement time.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }
}

/// A requested line with the catalog price read for it.
#[derive(Clone, Copy, Debug)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: Quantity,
    pub unit_price: Money,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Paid, Self::Shipped, Self::Delivered, Self::Canceled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Canceled) }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid | Canceled) | (Paid, Shipped | Canceled) | (Shipped, Delivered | Canceled)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ShopError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl Order {
    /// Builds a pending order, copying each line's unit price into its item.
    pub fn place(
        user_id: Uuid,
        lines: &[PricedLine],
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::now_v7(),
                order_id: id,
                product_id: line.product_id,
                quantity: line.quantity.get(),
                price: line.unit_price,
                created_at: now,
            })
            .collect();
        let total_amount = items.iter().map(OrderItem::line_total).sum();

        Self {
            id, user_id: Some(user_id), status: OrderStatus::Pending, total_amount,
            shipping_address, payment_method, items, created_at: now, updated_at: now,
        }
    }

    pub fn belongs_to(&self, user_id: Uuid) -> bool { self.user_id == Some(user_id) }

    /// Moves the order along the status table and returns the status it left.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<OrderStatus, ShopError> {
        if next == OrderStatus::Canceled {
            return self.cancel();
        }
        if !self.status.can_transition_to(next) {
            return Err(ShopError::InvalidStatusTransition { from: self.status, to: next });
        }
        let previous = std::mem::replace(&mut self.status, next);
        self.touch();
        Ok(previous)
    }

    pub fn cancel(&mut self) -> Result<OrderStatus, ShopError> {
        match self.status {
            OrderStatus::Canceled => Err(ShopError::OrderAlreadyCanceled),
            OrderStatus::Delivered => Err(ShopError::CannotCancelDelivered),
            _ => {
                let previous = std::mem::replace(&mut self.status, OrderStatus::Canceled);
                self.touch();
                Ok(previous)
            }
        }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn address() -> ShippingAddress {
        ShippingAddress { street: "1 Main St".into(), city: "Lviv".into(), postal_code: "79000".into(), country: "UA".into() }
    }

    fn pending_order() -> Order {
        let line = PricedLine { product_id: Uuid::new_v4(), quantity: Quantity::new(2).unwrap(), unit_price: Money::new(dec!(10)) };
        Order::place(Uuid::new_v4(), &[line], address(), PaymentMethod::Card)
    }

    #[test]
    fn test_place_snapshots_prices() {
        let lines = [
            PricedLine { product_id: Uuid::new_v4(), quantity: Quantity::new(2).unwrap(), unit_price: Money::new(dec!(10.25)) },
            PricedLine { product_id: Uuid::new_v4(), quantity: Quantity::new(1).unwrap(), unit_price: Money::new(dec!(5)) },
        ];
        let order = Order::place(Uuid::new_v4(), &lines, address(), PaymentMethod::Cash);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount.amount(), dec!(25.50));
        assert_eq!(order.items.len(), 2);
        assert!(order.items.iter().all(|i| i.order_id == order.id));
        assert_eq!(order.items[0].price.amount(), dec!(10.25));
    }

    #[test]
    fn test_order_workflow() {
        let mut order = pending_order();
        assert_eq!(order.transition_to(OrderStatus::Paid).unwrap(), OrderStatus::Pending);
        order.transition_to(OrderStatus::Shipped).unwrap();
        order.transition_to(OrderStatus::Delivered).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.status.is_terminal());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut order = pending_order();
        let err = order.transition_to(OrderStatus::Shipped).unwrap_err();
        assert!(matches!(
            err,
            ShopError::InvalidStatusTransition { from: OrderStatus::Pending, to: OrderStatus::Shipped }
        ));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.transition_to(OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_cancel_guards() {
        let mut order = pending_order();
        assert_eq!(order.cancel().unwrap(), OrderStatus::Pending);
        assert!(matches!(order.cancel(), Err(ShopError::OrderAlreadyCanceled)));

        let mut delivered = pending_order();
        delivered.status = OrderStatus::Delivered;
        assert!(matches!(delivered.transition_to(OrderStatus::Canceled), Err(ShopError::CannotCancelDelivered)));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!(matches!("completed".parse::<OrderStatus>(), Err(ShopError::InvalidStatus(s)) if s == "completed"));
    }
}

//! Domain events
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    StockReserved { product_id: Uuid, quantity: i32, remaining: i32 },
    StockReleased { product_id: Uuid, quantity: i32, remaining: i32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: Option<Uuid>, total: Money, item_count: usize },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

impl DomainEvent {
    /// Subject suffix the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::StockReserved { .. }) => "products.stock_reserved",
            Self::Product(ProductEvent::StockReleased { .. }) => "products.stock_released",
            Self::Order(OrderEvent::Created { .. }) => "orders.created",
            Self::Order(OrderEvent::StatusChanged { .. }) => "orders.status_changed",
        }
    }
}

impl From<OrderEvent> for DomainEvent {
    fn from(event: OrderEvent) -> Self { Self::Order(event) }
}

impl From<ProductEvent> for DomainEvent {
    fn from(event: ProductEvent) -> Self { Self::Product(event) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let event = DomainEvent::from(OrderEvent::StatusChanged {
            order_id: Uuid::nil(),
            from: OrderStatus::Pending,
            to: OrderStatus::Canceled,
        });
        assert_eq!(event.subject(), "orders.status_changed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["to"], "canceled");
    }
}

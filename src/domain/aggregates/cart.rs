//! Cart Aggregate
//!
//! A cart is the set of a user's rows, at most one per product. Totals are
//! computed from the catalog price at read time and never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Self {
        Self { id: Uuid::now_v7(), user_id, product_id, quantity: quantity.get(), created_at: Utc::now() }
    }

    /// Merges a repeated add of the same product into this row. Returns the
    /// new quantity, or `None` with the row untouched when the sum overflows.
    pub fn accumulate(&mut self, quantity: Quantity) -> Option<i32> {
        self.quantity = self.quantity.checked_add(quantity.get())?;
        Some(self.quantity)
    }
}

/// A cart row joined with the live catalog entry it points at.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct CartItemWithProduct {
    #[sqlx(flatten)]
    pub item: CartItem,
    pub product_name: String,
    pub product_price: Money,
    pub product_stock: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Money,
    pub product_stock: i32,
    pub quantity: i32,
    pub line_total: Money,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_price: Money,
}

impl CartView {
    pub fn from_items(rows: Vec<CartItemWithProduct>) -> Self {
        let items: Vec<CartLine> = rows
            .into_iter()
            .map(|row| CartLine {
                id: row.item.id,
                product_id: row.item.product_id,
                line_total: row.product_price.multiply(row.item.quantity),
                product_name: row.product_name,
                product_price: row.product_price,
                product_stock: row.product_stock,
                quantity: row.item.quantity,
            })
            .collect();
        let total_price = items.iter().map(|line| line.line_total).sum();
        Self { items, total_price }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn item_count(&self) -> usize { self.items.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(quantity: i32, price: Money) -> CartItemWithProduct {
        CartItemWithProduct {
            item: CartItem::new(Uuid::new_v4(), Uuid::new_v4(), Quantity::new(quantity).unwrap()),
            product_name: "Widget".into(),
            product_price: price,
            product_stock: 10,
        }
    }

    #[test]
    fn test_accumulate() {
        let mut item = CartItem::new(Uuid::new_v4(), Uuid::new_v4(), Quantity::new(2).unwrap());
        assert_eq!(item.accumulate(Quantity::new(3).unwrap()), Some(5));
        assert_eq!(item.quantity, 5);
    }

    #[test]
    fn test_accumulate_overflow_keeps_row() {
        let mut item = CartItem::new(Uuid::new_v4(), Uuid::new_v4(), Quantity::new(i32::MAX).unwrap());
        assert_eq!(item.accumulate(Quantity::new(1).unwrap()), None);
        assert_eq!(item.quantity, i32::MAX);
    }

    #[test]
    fn test_cart_total() {
        let cart = CartView::from_items(vec![row(2, Money::new(dec!(10))), row(3, Money::new(dec!(1.50)))]);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items[0].line_total.amount(), dec!(20));
        assert_eq!(cart.total_price.amount(), dec!(24.50));
    }

    #[test]
    fn test_empty_cart() {
        let cart = CartView::from_items(vec![]);
        assert!(cart.is_empty());
        assert_eq!(cart.total_price, Money::ZERO);
    }
}

//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{Money, Quantity};
use crate::ShopError;

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Money, stock: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: name.into(), description: String::new(), price, stock,
            category_id: None, image_url: None, created_at: now, updated_at: now,
        }
    }

    pub fn is_in_stock(&self) -> bool { self.stock > 0 }
    pub fn has_stock_for(&self, qty: Quantity) -> bool { self.stock >= qty.get() }

    pub fn update_price(&mut self, new_price: Money) {
        self.price = new_price;
        self.touch();
    }

    pub fn reserve(&mut self, qty: Quantity) -> Result<(), ShopError> {
        if !self.has_stock_for(qty) { return Err(ShopError::InsufficientStock); }
        self.stock -= qty.get();
        self.touch();
        Ok(())
    }

    /// Puts `qty` back on the shelf. `None` with stock untouched on overflow.
    pub fn release(&mut self, qty: Quantity) -> Option<i32> {
        self.stock = self.stock.checked_add(qty.get())?;
        self.touch();
        Some(self.stock)
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_product_create() {
        let p = Product::create("Test Product", Money::new(dec!(19.99)), 0);
        assert_eq!(p.name, "Test Product");
        assert!(!p.is_in_stock());
    }

    #[test]
    fn test_stock_reservation() {
        let mut p = Product::create("P", Money::new(dec!(10)), 10);
        p.reserve(Quantity::new(4).unwrap()).unwrap();
        assert_eq!(p.stock, 6);
        assert!(matches!(p.reserve(Quantity::new(7).unwrap()), Err(ShopError::InsufficientStock)));
        assert_eq!(p.stock, 6);
        assert_eq!(p.release(Quantity::new(4).unwrap()), Some(10));
        p.stock = i32::MAX;
        assert_eq!(p.release(Quantity::new(1).unwrap()), None);
        assert_eq!(p.stock, i32::MAX);
    }
}

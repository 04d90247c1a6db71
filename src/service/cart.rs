//! Cart reconciliation
//!
//! Repeated adds of one product collapse into a single row. Quantities are
//! always positive and totals come from the live catalog price.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::reference_error;
use crate::domain::aggregates::{CartItem, CartView};
use crate::domain::value_objects::Quantity;
use crate::repository::{CartRepository, RepositoryError};
use crate::{Result, ShopError};

#[derive(Clone, Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(default)]
    pub product_id: Uuid,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub quantity: i32,
    /// Moves the row onto another product when set.
    #[serde(default)]
    pub product_id: Option<Uuid>,
}

pub struct CartService {
    carts: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>) -> Self { Self { carts } }

    pub async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
        if user_id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        if product_id.is_nil() {
            return Err(ShopError::ProductIdRequired);
        }
        let quantity = Quantity::new(quantity)?;

        let item = self.carts.upsert_item(user_id, product_id, quantity).await.map_err(|e| match e {
            RepositoryError::OutOfRange => ShopError::InvalidQuantity,
            other => reference_error(other),
        })?;
        debug!(%user_id, %product_id, quantity = item.quantity, "cart item upserted");
        Ok(item)
    }

    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
        product_id: Option<Uuid>,
    ) -> Result<CartItem> {
        if user_id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        if item_id.is_nil() {
            return Err(ShopError::ItemIdRequired);
        }
        let quantity = Quantity::new(quantity)?;
        if product_id.is_some_and(|id| id.is_nil()) {
            return Err(ShopError::ProductIdRequired);
        }

        let mut item = self.carts.get_item_by_id(user_id, item_id).await?.ok_or(ShopError::ItemNotFound)?;

        if let Some(target) = product_id.filter(|id| *id != item.product_id) {
            if self.carts.get_item(user_id, target).await?.is_some() {
                return Err(ShopError::CartItemConflict);
            }
            item.product_id = target;
        }
        item.quantity = quantity.get();

        let updated = self.carts.update_item(&item).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => ShopError::CartItemConflict,
            other => reference_error(other),
        })?;
        if !updated {
            return Err(ShopError::ItemNotFound);
        }
        Ok(item)
    }

    pub async fn delete_item(&self, user_id: Uuid, item_id: Uuid) -> Result<()> {
        if user_id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        if item_id.is_nil() {
            return Err(ShopError::ItemIdRequired);
        }
        if !self.carts.remove_item(user_id, item_id).await? {
            return Err(ShopError::ItemNotFound);
        }
        Ok(())
    }

    /// Empties the cart. Clearing an empty cart succeeds.
    pub async fn clear_item(&self, user_id: Uuid) -> Result<()> {
        if user_id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        let removed = self.carts.clear(user_id).await?;
        debug!(%user_id, removed, "cart cleared");
        Ok(())
    }

    pub async fn list_item(&self, user_id: Uuid) -> Result<CartView> {
        if user_id.is_nil() {
            return Err(ShopError::UserIdRequired);
        }
        let rows = self.carts.list_with_products(user_id).await?;
        Ok(CartView::from_items(rows))
    }
}

//! In-process backend
//!
//! Mirrors the Postgres schema rules that services rely on: unique
//! `(user_id, product_id)` cart rows, unique emails, foreign keys with the
//! same cascade behaviour and constraint names.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    constraint, CartRepository, OrderQuery, OrderRepository, Page, ProductPatch, ProductQuery, ProductRepository,
    ProductSort, RepoResult, RepositoryError, UserQuery, UserRepository,
};
use crate::domain::aggregates::{CartItem, CartItemWithProduct, Order, OrderStatus, Product, User};
use crate::domain::value_objects::{Pagination, Quantity};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    cart_items: HashMap<Uuid, CartItem>,
    orders: HashMap<Uuid, Order>,
}

impl State {
    fn require_product(&self, id: Uuid, fk: &str) -> RepoResult<()> {
        if self.products.contains_key(&id) { Ok(()) } else { Err(RepositoryError::InvalidReference(fk.to_string())) }
    }

    fn require_user(&self, id: Uuid, fk: &str) -> RepoResult<()> {
        if self.users.contains_key(&id) { Ok(()) } else { Err(RepositoryError::InvalidReference(fk.to_string())) }
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users.values().any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Lock-guarded maps implementing every repository trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn paginate<T>(mut items: Vec<T>, page: Pagination) -> Page<T> {
    let total = items.len() as i64;
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX).min(items.len());
    let limit = usize::try_from(page.limit).unwrap_or(0);
    let items = items.drain(offset..).take(limit).collect();
    Page { items, total }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// =============================================================================
// Carts
// =============================================================================

#[async_trait]
impl CartRepository for MemoryStore {
    async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> RepoResult<CartItem> {
        let mut state = self.state.write().await;
        state.require_user(user_id, constraint::CART_USER_FK)?;
        state.require_product(product_id, constraint::CART_PRODUCT_FK)?;

        if let Some(existing) = state
            .cart_items
            .values_mut()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
        {
            existing.accumulate(quantity).ok_or(RepositoryError::OutOfRange)?;
            return Ok(existing.clone());
        }

        let item = CartItem::new(user_id, product_id, quantity);
        state.cart_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<Option<CartItem>> {
        let state = self.state.read().await;
        Ok(state.cart_items.values().find(|i| i.user_id == user_id && i.product_id == product_id).cloned())
    }

    async fn get_item_by_id(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<Option<CartItem>> {
        let state = self.state.read().await;
        Ok(state.cart_items.get(&item_id).filter(|i| i.user_id == user_id).cloned())
    }

    async fn update_item(&self, item: &CartItem) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        if !state.cart_items.get(&item.id).is_some_and(|row| row.user_id == item.user_id) {
            return Ok(false);
        }
        state.require_product(item.product_id, constraint::CART_PRODUCT_FK)?;
        let duplicate = state
            .cart_items
            .values()
            .any(|row| row.id != item.id && row.user_id == item.user_id && row.product_id == item.product_id);
        if duplicate {
            return Err(RepositoryError::Conflict(constraint::CART_USER_PRODUCT_UNIQUE.to_string()));
        }

        if let Some(row) = state.cart_items.get_mut(&item.id) {
            row.product_id = item.product_id;
            row.quantity = item.quantity;
        }
        Ok(true)
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        if !state.cart_items.get(&item_id).is_some_and(|row| row.user_id == user_id) {
            return Ok(false);
        }
        Ok(state.cart_items.remove(&item_id).is_some())
    }

    async fn clear(&self, user_id: Uuid) -> RepoResult<u64> {
        let mut state = self.state.write().await;
        let before = state.cart_items.len();
        state.cart_items.retain(|_, row| row.user_id != user_id);
        Ok((before - state.cart_items.len()) as u64)
    }

    async fn remove_checked_out(&self, user_id: Uuid, items: &[CartItem]) -> RepoResult<u64> {
        let mut state = self.state.write().await;
        let mut removed = 0;
        for ordered in items {
            let Some(row) = state.cart_items.get_mut(&ordered.id).filter(|row| row.user_id == user_id) else {
                continue;
            };
            if row.quantity > ordered.quantity {
                row.quantity -= ordered.quantity;
            } else {
                state.cart_items.remove(&ordered.id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn list_with_products(&self, user_id: Uuid) -> RepoResult<Vec<CartItemWithProduct>> {
        let state = self.state.read().await;
        let mut rows: Vec<CartItemWithProduct> = state
            .cart_items
            .values()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                state.products.get(&item.product_id).map(|product| CartItemWithProduct {
                    item: item.clone(),
                    product_name: product.name.clone(),
                    product_price: product.price,
                    product_stock: product.stock,
                })
            })
            .collect();
        rows.sort_by(|a, b| (a.item.created_at, a.item.id).cmp(&(b.item.created_at, b.item.id)));
        Ok(rows)
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: &Order) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if let Some(user_id) = order.user_id {
            state.require_user(user_id, constraint::ORDER_USER_FK)?;
        }
        for item in &order.items {
            state.require_product(item.product_id, constraint::ORDER_ITEM_PRODUCT_FK)?;
        }
        if state.orders.contains_key(&order.id) {
            return Err(RepositoryError::Conflict(constraint::ORDER_PKEY.to_string()));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list(&self, query: &OrderQuery) -> RepoResult<Page<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| query.user_id.map_or(true, |user_id| o.user_id == Some(user_id)))
            .filter(|o| query.status.map_or(true, |status| o.status == status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate(orders, query.page))
    }

    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// =============================================================================
// Products
// =============================================================================

fn compare_products(sort: ProductSort, a: &Product, b: &Product) -> Ordering {
    match sort {
        ProductSort::PriceAsc => (a.price, a.id).cmp(&(b.price, b.id)),
        ProductSort::PriceDesc => (b.price, b.id).cmp(&(a.price, a.id)),
        ProductSort::NameAsc => (&a.name, a.id).cmp(&(&b.name, b.id)),
        ProductSort::NameDesc => (&b.name, b.id).cmp(&(&a.name, a.id)),
        ProductSort::CreatedAtAsc => (a.created_at, a.id).cmp(&(b.created_at, b.id)),
        ProductSort::CreatedAtDesc => (b.created_at, b.id).cmp(&(a.created_at, a.id)),
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: &Product) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.products.contains_key(&product.id) {
            return Err(RepositoryError::Conflict(constraint::PRODUCT_PKEY.to_string()));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list(&self, query: &ProductQuery) -> RepoResult<Page<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| query.category_id.map_or(true, |c| p.category_id == Some(c)))
            .filter(|p| query.min_price.map_or(true, |min| p.price >= min))
            .filter(|p| query.max_price.map_or(true, |max| p.price <= max))
            .filter(|p| query.in_stock.map_or(true, |in_stock| p.is_in_stock() == in_stock))
            .filter(|p| {
                query
                    .search
                    .as_deref()
                    .map_or(true, |term| contains_ci(&p.name, term) || contains_ci(&p.description, term))
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| compare_products(query.sort, a, b));
        Ok(paginate(products, query.page))
    }

    async fn update(&self, id: Uuid, patch: &ProductPatch) -> RepoResult<Option<Product>> {
        let mut state = self.state.write().await;
        let Some(row) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            row.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            row.description.clone_from(description);
        }
        if let Some(price) = patch.price {
            row.update_price(price);
        }
        if let Some(stock) = patch.stock {
            row.stock = stock;
        }
        if patch.category_id.is_some() {
            row.category_id = patch.category_id;
        }
        if patch.image_url.is_some() {
            row.image_url.clone_from(&patch.image_url);
        }
        row.touch();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&id) {
            return Ok(false);
        }
        let ordered = state.orders.values().flat_map(|o| &o.items).any(|item| item.product_id == id);
        if ordered {
            return Err(RepositoryError::InvalidReference(constraint::ORDER_ITEM_PRODUCT_FK.to_string()));
        }
        state.cart_items.retain(|_, row| row.product_id != id);
        state.products.remove(&id);
        Ok(true)
    }

    async fn reserve_stock(&self, id: Uuid, quantity: Quantity) -> RepoResult<Option<i32>> {
        let mut state = self.state.write().await;
        Ok(state
            .products
            .get_mut(&id)
            .and_then(|product| product.reserve(quantity).ok().map(|()| product.stock)))
    }

    async fn release_stock(&self, id: Uuid, quantity: Quantity) -> RepoResult<Option<i32>> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) => product.release(quantity).map(Some).ok_or(RepositoryError::OutOfRange),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict(constraint::USER_EMAIL_UNIQUE.to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.state.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, query: &UserQuery) -> RepoResult<Page<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| query.role.map_or(true, |role| u.role == role))
            .filter(|u| {
                query.search.as_deref().map_or(true, |term| {
                    contains_ci(&u.email, term) || contains_ci(&u.first_name, term) || contains_ci(&u.last_name, term)
                })
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate(users, query.page))
    }

    async fn update(&self, user: &User) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Ok(false);
        }
        if state.email_taken(&user.email, Some(user.id)) {
            return Err(RepositoryError::Conflict(constraint::USER_EMAIL_UNIQUE.to_string()));
        }
        let mut row = user.clone();
        row.updated_at = Utc::now();
        state.users.insert(user.id, row);
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.cart_items.retain(|_, row| row.user_id != id);
        for order in state.orders.values_mut().filter(|o| o.user_id == Some(id)) {
            order.user_id = None;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Money;
    use rust_decimal_macros::dec;

    async fn seeded() -> (MemoryStore, User, Product) {
        let store = MemoryStore::new();
        let user = User::register("buyer@example.com", "hash", "Bo", "Yu");
        let product = Product::create("Kettle", Money::new(dec!(30)), 5);
        UserRepository::create(&store, &user).await.unwrap();
        ProductRepository::create(&store, &product).await.unwrap();
        (store, user, product)
    }

    #[tokio::test]
    async fn test_upsert_accumulates_into_one_row() {
        let (store, user, product) = seeded().await;
        let first = store.upsert_item(user.id, product.id, Quantity::new(2).unwrap()).await.unwrap();
        let second = store.upsert_item(user.id, product.id, Quantity::new(3).unwrap()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);
        assert_eq!(store.list_with_products(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_unknown_product_is_invalid_reference() {
        let (store, user, _) = seeded().await;
        let err = store.upsert_item(user.id, Uuid::new_v4(), Quantity::new(1).unwrap()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidReference(c) if c == constraint::CART_PRODUCT_FK));
    }

    #[tokio::test]
    async fn test_reserve_is_conditional() {
        let (store, _, product) = seeded().await;
        assert_eq!(store.reserve_stock(product.id, Quantity::new(3).unwrap()).await.unwrap(), Some(2));
        assert_eq!(store.reserve_stock(product.id, Quantity::new(3).unwrap()).await.unwrap(), None);
        assert_eq!(store.release_stock(product.id, Quantity::new(3).unwrap()).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_upsert_overflow_is_out_of_range() {
        let (store, user, product) = seeded().await;
        store.upsert_item(user.id, product.id, Quantity::new(i32::MAX).unwrap()).await.unwrap();
        let err = store.upsert_item(user.id, product.id, Quantity::new(1).unwrap()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::OutOfRange));
        assert_eq!(store.get_item(user.id, product.id).await.unwrap().unwrap().quantity, i32::MAX);
    }

    #[tokio::test]
    async fn test_remove_checked_out_keeps_later_additions() {
        let (store, user, kettle) = seeded().await;
        let toaster = Product::create("Toaster", Money::new(dec!(25)), 5);
        ProductRepository::create(&store, &toaster).await.unwrap();

        let read = store.upsert_item(user.id, kettle.id, Quantity::new(2).unwrap()).await.unwrap();
        store.upsert_item(user.id, kettle.id, Quantity::new(1).unwrap()).await.unwrap();
        store.upsert_item(user.id, toaster.id, Quantity::new(1).unwrap()).await.unwrap();

        assert_eq!(store.remove_checked_out(user.id, &[read]).await.unwrap(), 0);
        let rows = store.list_with_products(user.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(store.get_item(user.id, kettle.id).await.unwrap().unwrap().quantity, 1);

        let kettle_row = store.get_item(user.id, kettle.id).await.unwrap().unwrap();
        assert_eq!(store.remove_checked_out(user.id, &[kettle_row]).await.unwrap(), 1);
        assert!(store.get_item(user.id, kettle.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_leaves_unset_columns() {
        let (store, _, product) = seeded().await;
        store.reserve_stock(product.id, Quantity::new(2).unwrap()).await.unwrap();

        let patch = ProductPatch { name: Some("Kettle II".into()), ..Default::default() };
        let updated = ProductRepository::update(&store, product.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "Kettle II");
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.price, product.price);
        assert!(ProductRepository::update(&store, Uuid::new_v4(), &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_paginate_reports_full_total() {
        let page = paginate((0..45).collect::<Vec<_>>(), Pagination::new(20, 40));
        assert_eq!(page.total, 45);
        assert_eq!(page.items, vec![40, 41, 42, 43, 44]);
        assert!(paginate(vec![1, 2], Pagination::new(10, 5)).items.is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_detaches_orders() {
        use crate::domain::aggregates::PricedLine;
        use crate::domain::value_objects::{PaymentMethod, ShippingAddress};

        let (store, user, product) = seeded().await;
        let line = PricedLine { product_id: product.id, quantity: Quantity::new(1).unwrap(), unit_price: product.price };
        let order = Order::place(user.id, &[line], ShippingAddress::default(), PaymentMethod::Cash);
        OrderRepository::create(&store, &order).await.unwrap();
        store.upsert_item(user.id, product.id, Quantity::new(1).unwrap()).await.unwrap();

        assert!(UserRepository::delete(&store, user.id).await.unwrap());
        let kept = OrderRepository::get_by_id(&store, order.id).await.unwrap().unwrap();
        assert_eq!(kept.user_id, None);
        assert!(store.list_with_products(user.id).await.unwrap().is_empty());
        assert!(!UserRepository::delete(&store, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_ordered_product_cannot_be_deleted() {
        use crate::domain::aggregates::PricedLine;
        use crate::domain::value_objects::{PaymentMethod, ShippingAddress};

        let (store, user, product) = seeded().await;
        let line = PricedLine { product_id: product.id, quantity: Quantity::new(1).unwrap(), unit_price: product.price };
        let order = Order::place(user.id, &[line], ShippingAddress::default(), PaymentMethod::Card);
        OrderRepository::create(&store, &order).await.unwrap();
        let err = ProductRepository::delete(&store, product.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidReference(_)));
    }
}

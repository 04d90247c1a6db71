//! Application services
//!
//! Each service validates its input, talks to the repositories it was built
//! with and maps storage failures onto [`ShopError`].

pub mod auth;
pub mod cart;
pub mod order;
pub mod product;
pub mod user;

use std::sync::Arc;

use serde::Serialize;

use crate::auth::TokenIssuer;
use crate::domain::value_objects::Pagination;
use crate::publisher::EventPublisher;
use crate::repository::{constraint, Page, Repositories, RepositoryError};
use crate::ShopError;

pub use auth::AuthService;
pub use cart::CartService;
pub use order::OrderService;
pub use product::ProductService;
pub use user::UserService;

/// A page of results as returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Paginated<T> {
    pub fn new(page: Page<T>, window: Pagination) -> Self {
        Self { data: page.items, total: page.total, limit: window.limit, offset: window.offset }
    }
}

/// Maps a dangling foreign key onto the not-found error of the missing row.
pub(crate) fn reference_error(error: RepositoryError) -> ShopError {
    match &error {
        RepositoryError::InvalidReference(name) if constraint::is_user_reference(name) => ShopError::UserNotFound,
        RepositoryError::InvalidReference(_) => ShopError::ProductNotFound,
        _ => ShopError::Storage(error),
    }
}

/// Trims and drops empty search terms.
pub(crate) fn search_term(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub products: Arc<ProductService>,
    pub users: Arc<UserService>,
}

impl Services {
    pub fn new(repos: Repositories, tokens: TokenIssuer, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            auth: Arc::new(AuthService::new(repos.users.clone(), tokens)),
            carts: Arc::new(CartService::new(repos.carts.clone())),
            orders: Arc::new(OrderService::new(
                repos.orders.clone(),
                repos.products.clone(),
                repos.carts.clone(),
                events.clone(),
            )),
            products: Arc::new(ProductService::new(repos.products.clone(), events)),
            users: Arc::new(UserService::new(repos.users)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use crate::domain::aggregates::{Product, User};
    use crate::domain::value_objects::{Money, ShippingAddress};
    use crate::repository::{MemoryStore, Repositories};

    pub fn repos() -> Repositories {
        Repositories::from_store(Arc::new(MemoryStore::new()))
    }

    pub async fn user(repos: &Repositories) -> User {
        let user = User::register(format!("{}@example.com", uuid::Uuid::new_v4()), "hash", "Test", "User");
        repos.users.create(&user).await.unwrap();
        user
    }

    pub async fn product(repos: &Repositories, price: Decimal, stock: i32) -> Product {
        let product = Product::create("Ceramic mug", Money::new(price), stock);
        repos.products.create(&product).await.unwrap();
        product
    }

    pub fn address() -> ShippingAddress {
        ShippingAddress {
            street: "12 Harbour Rd".into(),
            city: "Odesa".into(),
            postal_code: "65000".into(),
            country: "UA".into(),
        }
    }
}

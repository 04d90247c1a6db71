//! Persistence boundary
//!
//! Services only see the traits below. Two backends implement them: Postgres
//! through sqlx and an in-process store used by tests and local runs.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::error::ErrorKind;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{CartItem, CartItemWithProduct, Order, OrderStatus, Product, Role, User};
use crate::domain::value_objects::{Money, Pagination, Quantity};
use crate::ShopError;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("referenced record does not exist: {0}")]
    InvalidReference(String),

    #[error("value out of range for its column")]
    OutOfRange,

    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }

        let (kind, code, constraint) = match error.as_database_error() {
            Some(db) => (
                Some(db.kind()),
                db.code().map(|code| code.into_owned()),
                db.constraint().unwrap_or_default().to_string(),
            ),
            None => (None, None, String::new()),
        };

        if code.as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return Self::OutOfRange;
        }
        match kind {
            Some(ErrorKind::UniqueViolation) => Self::Conflict(constraint),
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference(constraint),
            _ => Self::Database(error),
        }
    }
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// SQLSTATE raised when arithmetic overflows an integer or numeric column.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Constraint names as declared in the migrations.
pub mod constraint {
    pub const USER_EMAIL_UNIQUE: &str = "users_email_key";
    pub const PRODUCT_PKEY: &str = "products_pkey";
    pub const ORDER_PKEY: &str = "orders_pkey";
    pub const CART_USER_PRODUCT_UNIQUE: &str = "cart_items_user_id_product_id_key";
    pub const CART_USER_FK: &str = "cart_items_user_id_fkey";
    pub const CART_PRODUCT_FK: &str = "cart_items_product_id_fkey";
    pub const ORDER_USER_FK: &str = "orders_user_id_fkey";
    pub const ORDER_ITEM_PRODUCT_FK: &str = "order_items_product_id_fkey";

    pub fn is_user_reference(name: &str) -> bool {
        name == CART_USER_FK || name == ORDER_USER_FK
    }
}

// =============================================================================
// Queries
// =============================================================================

/// One page of results plus the size of the whole filtered set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub page: Pagination,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    CreatedAtAsc,
    #[default]
    CreatedAtDesc,
}

impl ProductSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::CreatedAtAsc => "created_at_asc",
            Self::CreatedAtDesc => "created_at_desc",
        }
    }

    /// ORDER BY clause, with the id as tie breaker so paging is stable.
    pub fn order_clause(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
            Self::NameAsc => "name ASC, id ASC",
            Self::NameDesc => "name DESC, id DESC",
            Self::CreatedAtAsc => "created_at ASC, id ASC",
            Self::CreatedAtDesc => "created_at DESC, id DESC",
        }
    }
}

impl FromStr for ProductSort {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::PriceAsc, Self::PriceDesc, Self::NameAsc, Self::NameDesc, Self::CreatedAtAsc, Self::CreatedAtDesc]
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| ShopError::InvalidInput(format!("invalid order_by: {s}")))
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
    pub sort: ProductSort,
    pub page: Pagination,
}

/// Columns to overwrite on a product. `None` keeps the stored value, so a
/// patch never clobbers a stock change it did not ask for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category_id.is_none()
            && self.image_url.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub page: Pagination,
}

// =============================================================================
// Repository traits
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Inserts the row or adds `quantity` to the existing one in a single statement.
    async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> RepoResult<CartItem>;
    async fn get_item(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<Option<CartItem>>;
    async fn get_item_by_id(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<Option<CartItem>>;
    /// Writes product and quantity of a row owned by `item.user_id`.
    async fn update_item(&self, item: &CartItem) -> RepoResult<bool>;
    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<bool>;
    async fn clear(&self, user_id: Uuid) -> RepoResult<u64>;
    /// Takes checked-out rows off the cart. Each row loses the quantity it had
    /// when it was read and is deleted once nothing is left, so rows added or
    /// topped up in the meantime stay.
    async fn remove_checked_out(&self, user_id: Uuid, items: &[CartItem]) -> RepoResult<u64>;
    async fn list_with_products(&self, user_id: Uuid) -> RepoResult<Vec<CartItemWithProduct>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores the order and all of its items atomically.
    async fn create(&self, order: &Order) -> RepoResult<()>;
    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Order>>;
    async fn list(&self, query: &OrderQuery) -> RepoResult<Page<Order>>;
    /// Compare-and-set on the status. `false` when the row is gone or its
    /// status is no longer `from`.
    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> RepoResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> RepoResult<()>;
    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Product>>;
    async fn list(&self, query: &ProductQuery) -> RepoResult<Page<Product>>;
    /// Applies `patch` in one statement and returns the stored row.
    async fn update(&self, id: Uuid, patch: &ProductPatch) -> RepoResult<Option<Product>>;
    async fn delete(&self, id: Uuid) -> RepoResult<bool>;
    /// Decrements stock only when enough is left. Returns the remaining
    /// stock, or `None` when the product is missing or short.
    async fn reserve_stock(&self, id: Uuid, quantity: Quantity) -> RepoResult<Option<i32>>;
    async fn release_stock(&self, id: Uuid, quantity: Quantity) -> RepoResult<Option<i32>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> RepoResult<()>;
    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list(&self, query: &UserQuery) -> RepoResult<Page<User>>;
    async fn update(&self, user: &User) -> RepoResult<bool>;
    async fn delete(&self, id: Uuid) -> RepoResult<bool>;
}

/// Every repository the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            carts: Arc::new(postgres::PgCartRepository::new(pool.clone())),
            orders: Arc::new(postgres::PgOrderRepository::new(pool.clone())),
            products: Arc::new(postgres::PgProductRepository::new(pool.clone())),
            users: Arc::new(postgres::PgUserRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    pub fn from_store(store: Arc<MemoryStore>) -> Self {
        Self { carts: store.clone(), orders: store.clone(), products: store.clone(), users: store }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(RepositoryError::from(sqlx::Error::RowNotFound), RepositoryError::NotFound));
        assert!(matches!(RepositoryError::from(sqlx::Error::PoolTimedOut), RepositoryError::Database(_)));
    }

    #[test]
    fn test_product_sort_parsing() {
        assert_eq!("price_desc".parse::<ProductSort>().unwrap(), ProductSort::PriceDesc);
        assert_eq!(ProductSort::default().order_clause(), "created_at DESC, id DESC");
        assert!("random".parse::<ProductSort>().is_err());
    }
}

//! Storefront backend
//!
//! Self-hosted shop API with a relational store behind it.
//!
//! ## Features
//! - Product catalog with stock reservation
//! - Per-user carts that merge repeated additions
//! - Orders that snapshot prices and follow a guarded status lifecycle
//! - Token authentication and user administration

pub mod auth;
pub mod config;
pub mod domain;
pub mod http;
pub mod publisher;
pub mod repository;
pub mod service;

use thiserror::Error;

use crate::domain::aggregates::OrderStatus;
use crate::repository::RepositoryError;

// =============================================================================
// Error Types
// =============================================================================

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

#[derive(Error, Debug)]
pub enum ShopError {
    // validation
    #[error("user id is required")]
    UserIdRequired,

    #[error("product id is required")]
    ProductIdRequired,

    #[error("item id is required")]
    ItemIdRequired,

    #[error("order id is required")]
    OrderIdRequired,

    #[error("quantity must be greater than 0")]
    InvalidQuantity,

    #[error("shipping address is required")]
    ShippingAddressRequired,

    #[error("invalid payment method")]
    PaymentMethodInvalid,

    #[error("order must contain at least one item")]
    OrderMustContainItem,

    #[error("status is required")]
    StatusRequired,

    #[error("invalid order status: {0}")]
    InvalidStatus(String),

    #[error("cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("price must be greater than 0")]
    InvalidPrice,

    #[error("user email is required")]
    EmailRequired,

    #[error("user password is required")]
    PasswordRequired,

    #[error("password must be at least 8 characters")]
    WeakPassword,

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // authentication
    #[error("missing authorization header")]
    MissingToken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    TokenExpired,

    #[error("admin access required")]
    Forbidden,

    // not found
    #[error("order not found")]
    OrderNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("user not found")]
    UserNotFound,

    // conflict
    #[error("order already canceled")]
    OrderAlreadyCanceled,

    #[error("cannot cancel a delivered order")]
    CannotCancelDelivered,

    #[error("insufficient stock for product")]
    InsufficientStock,

    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("product is already in the cart")]
    CartItemConflict,

    #[error("order status was changed concurrently")]
    OrderStatusConflict,

    #[error("product is referenced by existing orders")]
    ProductInUse,

    // infrastructure
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserIdRequired
            | Self::ProductIdRequired
            | Self::ItemIdRequired
            | Self::OrderIdRequired
            | Self::InvalidQuantity
            | Self::ShippingAddressRequired
            | Self::PaymentMethodInvalid
            | Self::OrderMustContainItem
            | Self::StatusRequired
            | Self::InvalidStatus(_)
            | Self::InvalidStatusTransition { .. }
            | Self::InvalidPrice
            | Self::EmailRequired
            | Self::PasswordRequired
            | Self::WeakPassword
            | Self::NoFieldsToUpdate
            | Self::InvalidInput(_) => ErrorKind::Validation,

            Self::MissingToken
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired => ErrorKind::Unauthorized,

            Self::Forbidden => ErrorKind::Forbidden,

            Self::OrderNotFound | Self::ItemNotFound | Self::ProductNotFound | Self::UserNotFound => {
                ErrorKind::NotFound
            }

            Self::OrderAlreadyCanceled
            | Self::CannotCancelDelivered
            | Self::InsufficientStock
            | Self::EmailAlreadyExists
            | Self::CartItemConflict
            | Self::OrderStatusConflict
            | Self::ProductInUse => ErrorKind::Conflict,

            Self::Storage(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidInput(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ShopError::OrderMustContainItem.kind(), ErrorKind::Validation);
        assert_eq!(ShopError::ItemNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ShopError::CannotCancelDelivered.kind(), ErrorKind::Conflict);
        assert_eq!(ShopError::TokenExpired.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            ShopError::Storage(RepositoryError::NotFound).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_transition_message() {
        let err = ShopError::InvalidStatusTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        };
        assert_eq!(err.to_string(), "cannot change order status from pending to shipped");
    }
}

//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{CartItem, CartItemWithProduct, CartLine, CartView};
pub use order::{Order, OrderItem, OrderStatus, PricedLine};
pub use product::Product;
pub use user::{Role, User};

//! Repository tests against a real Postgres. Each test gets a fresh database
//! from `DATABASE_URL` with the migrations applied.
//!
//! Run with `cargo test --features postgres-tests`.

#![cfg(feature = "postgres-tests")]

use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use storefront::domain::aggregates::{Order, OrderStatus, PricedLine, Product, User};
use storefront::domain::value_objects::{Money, Pagination, PaymentMethod, Quantity, ShippingAddress};
use storefront::repository::{OrderQuery, ProductPatch, Repositories, RepositoryError};

async fn seeded(pool: PgPool) -> (Repositories, User, Product) {
    let repos = Repositories::postgres(pool);
    let user = User::register(format!("{}@example.com", Uuid::new_v4()), "hash", "Ola", "Nord");
    let product = Product::create("Teapot", Money::new(dec!(24.90)), 10);
    repos.users.create(&user).await.unwrap();
    repos.products.create(&product).await.unwrap();
    (repos, user, product)
}

fn qty(value: i32) -> Quantity {
    Quantity::new(value).unwrap()
}

async fn place(repos: &Repositories, user: &User, product: &Product) -> Order {
    let line = PricedLine { product_id: product.id, quantity: qty(1), unit_price: product.price };
    let order = Order::place(user.id, &[line], ShippingAddress::default(), PaymentMethod::Card);
    repos.orders.create(&order).await.unwrap();
    order
}

#[sqlx::test(migrations = "./migrations")]
async fn test_upsert_accumulates(pool: PgPool) {
    let (repos, user, product) = seeded(pool).await;
    let first = repos.carts.upsert_item(user.id, product.id, qty(2)).await.unwrap();
    let second = repos.carts.upsert_item(user.id, product.id, qty(3)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 5);

    let err = repos.carts.upsert_item(user.id, Uuid::new_v4(), qty(1)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidReference(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_upsert_overflow_is_out_of_range(pool: PgPool) {
    let (repos, user, product) = seeded(pool).await;
    repos.carts.upsert_item(user.id, product.id, qty(i32::MAX)).await.unwrap();
    let err = repos.carts.upsert_item(user.id, product.id, qty(1)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::OutOfRange));

    let err = repos.products.release_stock(product.id, qty(i32::MAX)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::OutOfRange));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_remove_checked_out(pool: PgPool) {
    let (repos, user, teapot) = seeded(pool).await;
    let cups = Product::create("Cups", Money::new(dec!(4.50)), 10);
    repos.products.create(&cups).await.unwrap();

    let read = repos.carts.upsert_item(user.id, teapot.id, qty(2)).await.unwrap();
    repos.carts.upsert_item(user.id, teapot.id, qty(1)).await.unwrap();
    repos.carts.upsert_item(user.id, cups.id, qty(4)).await.unwrap();

    assert_eq!(repos.carts.remove_checked_out(user.id, &[read]).await.unwrap(), 0);
    assert_eq!(repos.carts.get_item(user.id, teapot.id).await.unwrap().unwrap().quantity, 1);
    assert_eq!(repos.carts.get_item(user.id, cups.id).await.unwrap().unwrap().quantity, 4);

    let rows: Vec<_> = repos.carts.list_with_products(user.id).await.unwrap().into_iter().map(|r| r.item).collect();
    assert_eq!(repos.carts.remove_checked_out(user.id, &rows).await.unwrap(), 2);
    assert!(repos.carts.list_with_products(user.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reserve_is_conditional(pool: PgPool) {
    let (repos, _, product) = seeded(pool).await;
    assert_eq!(repos.products.reserve_stock(product.id, qty(7)).await.unwrap(), Some(3));
    assert_eq!(repos.products.reserve_stock(product.id, qty(4)).await.unwrap(), None);
    assert_eq!(repos.products.reserve_stock(Uuid::new_v4(), qty(1)).await.unwrap(), None);
    assert_eq!(repos.products.release_stock(product.id, qty(2)).await.unwrap(), Some(5));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_patch_keeps_stock(pool: PgPool) {
    let (repos, _, product) = seeded(pool).await;
    repos.products.reserve_stock(product.id, qty(4)).await.unwrap();

    let patch = ProductPatch { name: Some("Teapot XL".into()), price: Some(dec!(29.99).into()), ..Default::default() };
    let updated = repos.products.update(product.id, &patch).await.unwrap().unwrap();
    assert_eq!(updated.name, "Teapot XL");
    assert_eq!(updated.price.amount(), dec!(29.99));
    assert_eq!(updated.stock, 6);
    assert_eq!(updated.description, product.description);

    assert!(repos.products.update(Uuid::new_v4(), &patch).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_order_list_counts_filtered_set(pool: PgPool) {
    let (repos, user, product) = seeded(pool).await;
    for _ in 0..3 {
        place(&repos, &user, &product).await;
    }
    let paid = place(&repos, &user, &product).await;
    assert!(repos.orders.update_status(paid.id, OrderStatus::Pending, OrderStatus::Paid).await.unwrap());

    let query = OrderQuery { user_id: Some(user.id), status: Some(OrderStatus::Pending), page: Pagination::new(2, 0) };
    let page = repos.orders.list(&query).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 3);

    let stored = repos.orders.get_by_id(paid.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
    assert_eq!(stored.items.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_status_update_is_compare_and_set(pool: PgPool) {
    let (repos, user, product) = seeded(pool).await;
    let order = place(&repos, &user, &product).await;

    assert!(repos.orders.update_status(order.id, OrderStatus::Pending, OrderStatus::Paid).await.unwrap());
    assert!(!repos.orders.update_status(order.id, OrderStatus::Pending, OrderStatus::Canceled).await.unwrap());
    assert!(!repos.orders.update_status(Uuid::new_v4(), OrderStatus::Pending, OrderStatus::Paid).await.unwrap());
}

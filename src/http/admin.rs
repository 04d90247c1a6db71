//! Admin-only routes. Every handler takes an [`AdminUser`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{AdminUser, AppState};
use crate::domain::aggregates::{Order, Product, User};
use crate::service::order::{OrderFilter, UpdateStatusRequest};
use crate::service::product::{CreateProductRequest, StockLevel, StockRequest, UpdateProductRequest};
use crate::service::user::{UpdateUserRequest, UserFilter};
use crate::service::Paginated;
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/products/:id/reserve", post(reserve_stock))
        .route("/products/:id/release", post(release_stock))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
}

// =============================================================================
// Products
// =============================================================================

async fn create_product(
    State(s): State<AppState>,
    _: AdminUser,
    Json(r): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = s.services.products.create_product(r).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(s): State<AppState>,
    _: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(s.services.products.update_product(id, r).await?))
}

async fn delete_product(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.services.products.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reserve_stock(
    State(s): State<AppState>,
    _: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<StockRequest>,
) -> Result<Json<StockLevel>> {
    Ok(Json(s.services.products.reserve_stock(id, r.quantity).await?))
}

async fn release_stock(
    State(s): State<AppState>,
    _: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<StockRequest>,
) -> Result<Json<StockLevel>> {
    Ok(Json(s.services.products.release_stock(id, r.quantity).await?))
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(
    State(s): State<AppState>,
    _: AdminUser,
    Query(f): Query<OrderFilter>,
) -> Result<Json<Paginated<Order>>> {
    Ok(Json(s.services.orders.list_order(f).await?))
}

async fn get_order(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.get_order(id).await?))
}

async fn update_order_status(
    State(s): State<AppState>,
    _: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.update_order_status(id, &r.status).await?))
}

// =============================================================================
// Users
// =============================================================================

async fn list_users(
    State(s): State<AppState>,
    _: AdminUser,
    Query(f): Query<UserFilter>,
) -> Result<Json<Paginated<User>>> {
    Ok(Json(s.services.users.list_users(f).await?))
}

async fn get_user(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<Json<User>> {
    Ok(Json(s.services.users.get_user(id).await?))
}

async fn update_user(
    State(s): State<AppState>,
    _: AdminUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    Ok(Json(s.services.users.update_user(id, r, true).await?))
}

async fn delete_user(State(s): State<AppState>, _: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

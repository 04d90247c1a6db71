use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use uuid::Uuid;

use super::extract::{Json, Path};
use super::{AppState, CurrentUser};
use crate::domain::aggregates::{CartItem, CartView, Order};
use crate::service::cart::{AddItemRequest, UpdateItemRequest};
use crate::service::order::CheckoutRequest;
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", put(update_item).delete(delete_item))
        .route("/cart/checkout", post(checkout))
}

async fn get_cart(State(s): State<AppState>, user: CurrentUser) -> Result<Json<CartView>> {
    Ok(Json(s.services.carts.list_item(user.id).await?))
}

async fn clear_cart(State(s): State<AppState>, user: CurrentUser) -> Result<StatusCode> {
    s.services.carts.clear_item(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(
    State(s): State<AppState>,
    user: CurrentUser,
    Json(r): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    let item = s.services.carts.add_item(user.id, r.product_id, r.quantity).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(s): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateItemRequest>,
) -> Result<Json<CartItem>> {
    Ok(Json(s.services.carts.update_item(user.id, id, r.quantity, r.product_id).await?))
}

async fn delete_item(State(s): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.services.carts.delete_item(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn checkout(
    State(s): State<AppState>,
    user: CurrentUser,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = s.services.orders.checkout(user.id, r).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

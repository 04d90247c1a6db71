use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::{AppState, CurrentUser};
use crate::domain::aggregates::Order;
use crate::service::order::{CreateOrderRequest, OrderFilter};
use crate::service::Paginated;
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", put(cancel_order))
}

async fn list_orders(
    State(s): State<AppState>,
    user: CurrentUser,
    Query(mut f): Query<OrderFilter>,
) -> Result<Json<Paginated<Order>>> {
    f.user_id = Some(user.id);
    Ok(Json(s.services.orders.list_order(f).await?))
}

async fn create_order(
    State(s): State<AppState>,
    user: CurrentUser,
    Json(r): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = s.services.orders.create_order(user.id, r).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(State(s): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.services.orders.get_order_for(user.id, id).await?))
}

async fn cancel_order(State(s): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let order = s.services.orders.get_order_for(user.id, id).await?;
    Ok(Json(s.services.orders.cancel_order(order.id).await?))
}

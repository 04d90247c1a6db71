use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::AppState;
use crate::domain::aggregates::Product;
use crate::service::product::ProductFilter;
use crate::service::Paginated;
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/availability", get(check_availability))
}

async fn list_products(State(s): State<AppState>, Query(f): Query<ProductFilter>) -> Result<Json<Paginated<Product>>> {
    Ok(Json(s.services.products.list_products(f).await?))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    Ok(Json(s.services.products.get_product(id).await?))
}

#[derive(Debug, Deserialize)]
struct AvailabilityParams {
    quantity: Option<i32>,
}

#[derive(Debug, Serialize)]
struct Availability {
    product_id: Uuid,
    quantity: i32,
    available: bool,
}

async fn check_availability(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Query(p): Query<AvailabilityParams>,
) -> Result<Json<Availability>> {
    let quantity = p.quantity.unwrap_or(1);
    let available = s.services.products.check_availability(id, quantity).await?;
    Ok(Json(Availability { product_id: id, quantity, available }))
}

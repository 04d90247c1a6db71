//! HTTP façade
//!
//! Public routes live under `/api/v1`, admin routes under `/api/v1/admin`.

mod admin;
mod auth;
mod cart;
mod error;
mod extract;
mod orders;
mod products;
mod users;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::Services;

pub use extract::{AdminUser, CurrentUser};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::routes())
        .merge(products::routes())
        .merge(users::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .nest("/admin", admin::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": env!("CARGO_PKG_NAME") }))
}

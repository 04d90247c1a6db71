use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use super::extract::Json;
use super::AppState;
use crate::service::auth::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

async fn register(
    State(s): State<AppState>,
    Json(r): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let registered = s.services.auth.register(r).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

async fn login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> Result<Json<AuthResponse>> {
    Ok(Json(s.services.auth.login(r).await?))
}

async fn refresh(State(s): State<AppState>, Json(r): Json<RefreshRequest>) -> Result<Json<AuthResponse>> {
    Ok(Json(s.services.auth.refresh(r).await?))
}

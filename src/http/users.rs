use axum::extract::State;
use axum::routing::get;
use axum::Router;

use super::extract::Json;
use super::{AppState, CurrentUser};
use crate::domain::aggregates::User;
use crate::service::user::UpdateUserRequest;
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/users/me", get(me).put(update_me))
}

async fn me(State(s): State<AppState>, user: CurrentUser) -> Result<Json<User>> {
    Ok(Json(s.services.users.get_user(user.id).await?))
}

async fn update_me(
    State(s): State<AppState>,
    user: CurrentUser,
    Json(r): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    Ok(Json(s.services.users.update_user(user.id, r, false).await?))
}

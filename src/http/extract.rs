//! Request extractors
//!
//! Body, path and query extractors reject with a [`ShopError`] so malformed
//! input gets the same JSON envelope as every other error. The bearer-token
//! extractors resolve the caller.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::Role;
use crate::ShopError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ShopError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ShopError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ShopError))]
pub struct Query<T>(pub T);

/// The caller behind a valid access token.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// A [`CurrentUser`] whose stored account still holds the admin role.
#[derive(Clone, Debug)]
pub struct AdminUser(pub CurrentUser);

fn bearer_token(parts: &Parts) -> Result<&str, ShopError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ShopError::MissingToken)?;
    Ok(header.strip_prefix("Bearer ").unwrap_or(header).trim())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.services.auth.validate_token(token)?;
        Ok(Self { id: claims.sub, email: claims.email, role: claims.role })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ShopError::Forbidden);
        }
        // tokens outlive role changes and account deletion
        let stored = state.services.users.get_user(user.id).await.map_err(|err| match err {
            ShopError::UserNotFound => ShopError::InvalidToken,
            other => other,
        })?;
        if stored.role != Role::Admin {
            return Err(ShopError::Forbidden);
        }
        Ok(Self(CurrentUser { role: stored.role, email: stored.email, ..user }))
    }
}

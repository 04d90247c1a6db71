//! `ShopError` as an HTTP response

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::{ErrorKind, ShopError};

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status_code();

        // internal details stay in the logs
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = %self, source = ?std::error::Error::source(&self), "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message, "status": status.as_u16() }))).into_response()
    }
}

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self { Self::InvalidInput(rejection.body_text()) }
}

impl From<PathRejection> for ShopError {
    fn from(rejection: PathRejection) -> Self { Self::InvalidInput(rejection.body_text()) }
}

impl From<QueryRejection> for ShopError {
    fn from(rejection: QueryRejection) -> Self { Self::InvalidInput(rejection.body_text()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryError;

    fn status_of(err: ShopError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(ShopError::InvalidQuantity), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ShopError::MissingToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ShopError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ShopError::OrderNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ShopError::InsufficientStock), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ShopError::Storage(RepositoryError::Database(sqlx::Error::PoolTimedOut))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

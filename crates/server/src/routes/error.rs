use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// The closed set of failures a request can surface. Everything a handler
/// or the move coordinator can go wrong with maps onto one of these kinds;
/// the [`IntoResponse`] adapter below is the only place status codes are
/// assigned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, (*message).to_string()),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, (*message).to_string()),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                (StatusCode::BAD_REQUEST, "resource already exists".to_string())
            }
            ApiError::Database(sqlx::Error::Database(db_err))
                if db_err.is_foreign_key_violation() =>
            {
                (StatusCode::NOT_FOUND, "related resource not found".to_string())
            }
            ApiError::Database(error) => {
                tracing::error!(?error, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_expected_status_codes() {
        let cases = [
            (ApiError::NotFound("card not found"), StatusCode::NOT_FOUND),
            (ApiError::Forbidden("not authorized"), StatusCode::FORBIDDEN),
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                ApiError::Validation("position must be a non-negative integer".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The body is the generic message, never the sqlx error text.
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use waflow_shared::CoreError;
use waflow_store::StoreError;

/// Failures as seen from the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No resolved identity on the request.
    #[error("Authentication required")]
    Unauthenticated,

    /// A core-layer failure (validation, ownership, quota, provider, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::Core(CoreError::UserNotFound),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Core(core) => match core {
                CoreError::Validation(_) => (StatusCode::BAD_REQUEST, core.to_string()),
                CoreError::UserNotFound => (StatusCode::NOT_FOUND, core.to_string()),
                CoreError::AccessDenied => (StatusCode::FORBIDDEN, core.to_string()),
                CoreError::QuotaExceeded(_) => (StatusCode::FORBIDDEN, core.to_string()),
                // Provider failures pass the backend's message through.
                CoreError::Provider(_) => (StatusCode::BAD_REQUEST, core.to_string()),
                CoreError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
            ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "success": false,
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                CoreError::validation("bad").into(),
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::UserNotFound.into(), StatusCode::NOT_FOUND),
            (CoreError::AccessDenied.into(), StatusCode::FORBIDDEN),
            (
                CoreError::QuotaExceeded("limit".into()).into(),
                StatusCode::FORBIDDEN,
            ),
            (
                CoreError::Provider("backend said no".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Internal("sqlite exploded".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

}

//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::LiveLogError;
use crate::transport::TransportError;

/// 425 Too Early, not among the named status constants
pub fn too_early() -> StatusCode {
    StatusCode::from_u16(425).unwrap_or(StatusCode::CONFLICT)
}

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    /// The activity exists but nothing has been scheduled for it yet
    TooEarly(String),
    Unavailable(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::TooEarly(msg) => (too_early(), msg),
            ApiError::Unavailable(msg) => {
                tracing::warn!("Refusing viewer: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<LiveLogError> for ApiError {
    fn from(err: LiveLogError) -> Self {
        match err {
            LiveLogError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LiveLogError::TooEarly { .. } => ApiError::TooEarly(err.to_string()),
            LiveLogError::Backend(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::TooEarly("x".into()), too_early()),
            (ApiError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                ApiError::InternalError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        assert_eq!(too_early().as_u16(), 425);
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_too_early_keeps_selector() {
        let err = ApiError::from(LiveLogError::TooEarly {
            selector: "branch=main,build=5".to_string(),
        });

        match err {
            ApiError::TooEarly(msg) => {
                assert_eq!(msg, "no PipelineRun found using labelSelector branch=main,build=5")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

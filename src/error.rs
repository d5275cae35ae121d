//! HTTP boundary errors
//!
//! Every failure leaving a handler becomes `{ "success": false, "message" }`
//! with a matching status code.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::auth::AuthError;
use crate::detection::DetectionError;
use crate::mandi::MandiError;
use crate::schemes::SchemeError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Internal(detail) => {
                error!(error = %detail, "Request failed");
                if cfg!(debug_assertions) {
                    json!({
                        "success": false,
                        "message": "Internal server error",
                        "error": detail,
                    })
                } else {
                    json!({ "success": false, "message": "Internal server error" })
                }
            }
            other => json!({ "success": false, "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => Self::BadRequest(msg),
            StoreError::NotFound(msg) => Self::NotFound(format!("Not found: {msg}")),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken(_) => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::EmailTaken | AuthError::InvalidInput(_) => Self::BadRequest(err.to_string()),
            AuthError::Internal(msg) => Self::Internal(msg),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<SchemeError> for AppError {
    fn from(err: SchemeError) -> Self {
        match err {
            SchemeError::SchemeNotFound | SchemeError::ApplicationNotFound => {
                Self::NotFound(err.to_string())
            }
            SchemeError::AlreadySubmitted(_) => Self::BadRequest(err.to_string()),
            SchemeError::Store(e) => e.into(),
        }
    }
}

impl From<DetectionError> for AppError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::Image(_) | DetectionError::Detector(_) => {
                Self::BadRequest(err.to_string())
            }
            DetectionError::Store(e) => e.into(),
        }
    }
}

impl From<MandiError> for AppError {
    fn from(err: MandiError) -> Self {
        match err {
            MandiError::NoData(_) => Self::NotFound(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(format!("Invalid form data: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_map_to_client_errors() {
        let err: AppError = StoreError::Validation("bad band".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = StoreError::NotFound("notif_1".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_service_errors_map_to_status() {
        let err: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err: AppError = AuthError::EmailTaken.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = SchemeError::SchemeNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: AppError = SchemeError::AlreadySubmitted("app_1".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = MandiError::NoData("Saffron".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No price data found for Saffron");
    }
}

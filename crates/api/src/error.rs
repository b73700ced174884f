use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fortyweeks_core::media::MediaError;
use fortyweeks_core::CoreError;
use serde_json::json;

/// API error type rendered as `{"error": {type, message, statusCode}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payloadTooLarge", msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Database(err) => {
                tracing::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            CoreError::Conflict(msg) => ApiError::Conflict(msg),
            CoreError::Forbidden(msg) => ApiError::Forbidden(msg),
            CoreError::Validation(err) => ApiError::BadRequest(err.to_string()),
            CoreError::Invite(_) => ApiError::NotFound("Invalid or expired invite".to_string()),
            CoreError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            CoreError::InvalidToken(_) => ApiError::Unauthorized("Invalid token".to_string()),
            CoreError::PasswordHash(msg) => ApiError::Internal(msg),
            CoreError::Media(err) => err.into(),
            CoreError::Mail(err) => ApiError::Internal(err.to_string()),
            CoreError::Database(err) => ApiError::Database(err),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotFound => ApiError::NotFound("File not found".to_string()),
            MediaError::InvalidPath | MediaError::UnsupportedType { .. } | MediaError::Empty => {
                ApiError::BadRequest(err.to_string())
            }
            MediaError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            MediaError::Io(err) => ApiError::Internal(format!("media storage: {err}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(format!("Multipart error: {}", err.body_text()))
        }
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

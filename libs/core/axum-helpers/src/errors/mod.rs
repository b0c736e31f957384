pub mod codes;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Error as UuidError;
use validator::ValidationErrors;

/// Body of every error response.
///
/// ```json
/// {
///   "code": 1012,
///   "error": "RATE_LIMITED",
///   "message": "You can only vote once per hour",
///   "details": { "retry_after_secs": 1740 }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured details (validation field errors, retry hints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application error type that can be converted to HTTP responses.
///
/// Domain crates convert their own errors into this type so every endpoint
/// answers with the same [`ErrorResponse`] shape.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("UUID error: {0}")]
    UuidError(#[from] UuidError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),

    #[error("Too Many Requests: {message}")]
    TooManyRequests {
        message: String,
        retry_after_secs: u64,
    },

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(e) => match e {
                DbErr::RecordNotFound(_) => StatusCode::NOT_FOUND,
                DbErr::ConnectionAcquire(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::JsonExtractorRejection(e) => e.status(),
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UuidError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Error code reported to clients.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Database(DbErr::RecordNotFound(_)) => ErrorCode::DatabaseNotFound,
            AppError::Database(DbErr::ConnectionAcquire(_)) => ErrorCode::DatabasePoolTimeout,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::JsonExtractorRejection(_) => ErrorCode::JsonExtraction,
            AppError::ValidationError(_) => ErrorCode::ValidationError,
            AppError::UuidError(_) => ErrorCode::InvalidUuid,
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::UnprocessableEntity(_) => ErrorCode::UnprocessableEntity,
            AppError::TooManyRequests { .. } => ErrorCode::RateLimited,
            AppError::InternalServerError(_) => ErrorCode::InternalError,
            AppError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
        }
    }

    fn log(&self, code: ErrorCode) {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error_code = code.code(), status = status.as_u16(), "{}", self);
        } else {
            tracing::info!(error_code = code.code(), status = status.as_u16(), "{}", self);
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = self.status();
        self.log(code);

        let mut retry_after = None;
        let (message, details) = match self {
            // Internal failure details stay in the logs.
            AppError::Database(_) => (code.default_message().to_string(), None),
            AppError::JsonExtractorRejection(e) => (e.body_text(), None),
            AppError::ValidationError(e) => (
                code.default_message().to_string(),
                serde_json::to_value(&e).ok(),
            ),
            AppError::UuidError(_) => (code.default_message().to_string(), None),
            AppError::TooManyRequests {
                message,
                retry_after_secs,
            } => {
                retry_after = Some(retry_after_secs);
                (
                    message,
                    Some(serde_json::json!({ "retry_after_secs": retry_after_secs })),
                )
            }
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::UnprocessableEntity(msg)
            | AppError::InternalServerError(msg)
            | AppError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            code: code.code(),
            error: code.as_str().to_string(),
            message,
            details,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Build an error response without going through [`AppError`].
pub fn error_response(status: StatusCode, message: String, error_code: ErrorCode) -> Response {
    let body = Json(ErrorResponse {
        code: error_code.code(),
        error: error_code.as_str().to_string(),
        message,
        details: None,
    });

    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_too_many_requests_sets_retry_after() {
        let response = AppError::TooManyRequests {
            message: "You can only vote once per hour".to_string(),
            retry_after_secs: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");

        let json = body_json(response).await;
        assert_eq!(json["error"], "RATE_LIMITED");
        assert_eq!(json["details"]["retry_after_secs"], 42);
    }

    #[tokio::test]
    async fn test_not_found_keeps_message() {
        let response = AppError::NotFound("Vote not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["code"], 1004);
        assert_eq!(json["message"], "Vote not found");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_database_error_mapping() {
        let not_found = AppError::Database(DbErr::RecordNotFound("user".to_string()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.error_code(), ErrorCode::DatabaseNotFound);

        let custom = AppError::Database(DbErr::Custom("boom".to_string()));
        assert_eq!(custom.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(custom.error_code(), ErrorCode::DatabaseError);
    }
}

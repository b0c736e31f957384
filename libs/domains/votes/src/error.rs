use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("You cannot vote for yourself")]
    SelfVote,

    #[error("Invalid vote value {0}: expected 1 or -1")]
    InvalidValue(i32),

    #[error("You can vote for this user again in {} seconds", retry_after_secs(.remaining))]
    Cooldown { remaining: Duration },

    #[error("No vote from {voter} for {target}")]
    NotFound { voter: Uuid, target: Uuid },

    #[error("User not found: {0}")]
    UnknownTarget(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timed out waiting for another vote on the same pair")]
    Timeout,

    #[error("Vote operation was cancelled")]
    Cancelled,
}

pub type VoteResult<T> = Result<T, VoteError>;

/// Whole seconds until the cooldown ends, rounded up.
fn retry_after_secs(remaining: &Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl From<VoteError> for AppError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::SelfVote | VoteError::InvalidValue(_) => {
                AppError::BadRequest(err.to_string())
            }
            VoteError::Cooldown { remaining } => AppError::TooManyRequests {
                message: err.to_string(),
                retry_after_secs: retry_after_secs(&remaining),
            },
            VoteError::NotFound { .. } => AppError::NotFound("Vote not found".to_string()),
            VoteError::UnknownTarget(id) => AppError::NotFound(format!("User {} not found", id)),
            VoteError::Storage(msg) => AppError::InternalServerError(msg),
            VoteError::Cancelled => AppError::InternalServerError(err.to_string()),
            VoteError::Timeout => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl IntoResponse for VoteError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: VoteError) -> StatusCode {
        AppError::from(err).status()
    }

    #[test]
    fn test_status_mapping() {
        let id = Uuid::now_v7();
        assert_eq!(status_of(VoteError::SelfVote), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(VoteError::InvalidValue(3)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(VoteError::Cooldown {
                remaining: Duration::from_secs(10)
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(VoteError::NotFound { voter: id, target: id }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(VoteError::UnknownTarget(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(VoteError::Storage("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_of(VoteError::Cancelled), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(VoteError::Timeout), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_cooldown_rounds_up() {
        let err = VoteError::Cooldown {
            remaining: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "You can vote for this user again in 2 seconds");

        match AppError::from(err) {
            AppError::TooManyRequests {
                retry_after_secs, ..
            } => assert_eq!(retry_after_secs, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, AuthError};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("Thread {0} is closed")]
    ThreadClosed(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection limit reached")]
    AtCapacity,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type MessagingResult<T> = Result<T, MessagingError>;

impl MessagingError {
    /// `code` of the gateway `error` event
    pub fn code(&self) -> &'static str {
        match self {
            MessagingError::ThreadNotFound(_) => "not_found",
            MessagingError::Forbidden(_) => "forbidden",
            MessagingError::ThreadClosed(_) => "thread_closed",
            MessagingError::Validation(_) => "bad_request",
            MessagingError::AtCapacity => "unavailable",
            MessagingError::Auth(_) => "unauthorized",
            MessagingError::Database(_) => "internal",
        }
    }

    /// Safe to show a client; database details stay in the logs
    pub fn client_message(&self) -> String {
        match self {
            MessagingError::Database(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<MessagingError> for AppError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::ThreadNotFound(id) => {
                AppError::NotFound(format!("Thread {} not found", id))
            }
            MessagingError::Forbidden(msg) => AppError::Forbidden(msg),
            closed @ MessagingError::ThreadClosed(_) => AppError::Rejected {
                reason: closed.code().to_string(),
                message: closed.to_string(),
            },
            MessagingError::Validation(msg) => AppError::BadRequest(msg),
            MessagingError::AtCapacity => {
                AppError::ServiceUnavailable("Messaging connection limit reached".to_string())
            }
            MessagingError::Auth(e) => e.into(),
            MessagingError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for MessagingError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MessagingError::ThreadNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (MessagingError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (MessagingError::ThreadClosed(Uuid::nil()), StatusCode::UNPROCESSABLE_ENTITY),
            (MessagingError::AtCapacity, StatusCode::SERVICE_UNAVAILABLE),
            (MessagingError::Auth(AuthError::MissingToken), StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_database_errors_are_not_shown_to_clients() {
        let err = MessagingError::Database(DbErr::Custom("relation missing".into()));
        assert_eq!(err.code(), "internal");
        assert!(!err.client_message().contains("relation"));
    }
}

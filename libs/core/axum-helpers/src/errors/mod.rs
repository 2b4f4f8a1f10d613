pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Body of every error response.
///
/// ```json
/// {
///   "code": 1008,
///   "error": "CONFLICT",
///   "message": "Product with SKU 'TSHIRT-01' already exists",
///   "details": null
/// }
/// ```
#[derive(Debug, Serialize, serde::Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable identifier, see [`ErrorCode`]
    pub error: String,
    pub message: String,
    /// Structured details, e.g. field validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            error: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Error type returned by every handler; domain errors convert into it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON parsing error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("UUID error: {0}")]
    UuidError(#[from] uuid::Error),

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

    /// 422 carrying a machine-readable reason in `details.reason`
    #[error("Unprocessable Entity: {message} ({reason})")]
    Rejected { reason: String, message: String },

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.classify().0
    }

    pub fn error_code(&self) -> ErrorCode {
        self.classify().1
    }

    fn classify(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::SerdeJson(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::SerdeJsonError),
            AppError::Database(e) => classify_db_error(e),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::IoError),
            AppError::Csv(_) => (StatusCode::BAD_REQUEST, ErrorCode::CsvError),
            AppError::JsonExtractorRejection(e) => (e.status(), ErrorCode::JsonExtraction),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, ErrorCode::ValidationError),
            AppError::UuidError(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidUuid),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            AppError::UnprocessableEntity(_) | AppError::Rejected { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::UnprocessableEntity,
            ),
            AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
            }
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable)
            }
        }
    }

    fn into_error_response(self) -> (StatusCode, ErrorResponse) {
        let (status, code) = self.classify();

        if status.is_server_error() {
            tracing::error!(error_code = code.code(), error = %self, "Request failed");
        } else {
            tracing::info!(error_code = code.code(), error = %self, "Request rejected");
        }

        let body = match self {
            // Internal details stay in the logs
            AppError::SerdeJson(_) | AppError::Io(_) | AppError::Database(_) => {
                ErrorResponse::new(code, code.default_message())
            }
            AppError::Csv(e) => ErrorResponse::new(code, e.to_string()),
            AppError::JsonExtractorRejection(e) => ErrorResponse::new(code, e.body_text()),
            AppError::ValidationError(e) => ErrorResponse::new(code, code.default_message())
                .with_details(serde_json::to_value(&e).unwrap_or(serde_json::Value::Null)),
            AppError::UuidError(_) => ErrorResponse::new(code, code.default_message()),
            AppError::Rejected { reason, message } => ErrorResponse::new(code, message)
                .with_details(serde_json::json!({ "reason": reason })),
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::UnprocessableEntity(msg)
            | AppError::InternalServerError(msg)
            | AppError::ServiceUnavailable(msg) => ErrorResponse::new(code, msg),
        };

        (status, body)
    }
}

fn classify_db_error(error: &DbErr) -> (StatusCode, ErrorCode) {
    match error {
        DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::DatabaseNotFound),
        DbErr::ConnectionAcquire(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::DatabasePoolTimeout)
        }
        _ => match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                (StatusCode::CONFLICT, ErrorCode::DatabaseUniqueViolation)
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                (StatusCode::CONFLICT, ErrorCode::DatabaseForeignKey)
            }
            Some(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseUnhandled),
            None => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_error_response();
        (status, Json(body)).into_response()
    }
}

/// Builds an error response outside the `AppError` flow (fallbacks, middleware).
pub fn error_response(status: StatusCode, message: impl Into<String>, code: ErrorCode) -> Response {
    (status, Json(ErrorResponse::new(code, message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: AppError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_conflict_keeps_message() {
        let (status, body) = body_of(AppError::Conflict("slug taken".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, 1008);
        assert_eq!(body.error, "CONFLICT");
        assert_eq!(body.message, "slug taken");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_rejected_carries_reason() {
        let err = AppError::Rejected {
            reason: "expired".into(),
            message: "Discount code has expired".into(),
        };
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.details.unwrap()["reason"], "expired");
    }

    #[tokio::test]
    async fn test_database_error_hides_internals() {
        let err = AppError::Database(DbErr::Custom("relation \"orders\" does not exist".into()));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "DATABASE_ERROR");
        assert!(!body.message.contains("orders"));
    }

    #[tokio::test]
    async fn test_record_not_found_is_404() {
        let err = AppError::Database(DbErr::RecordNotFound("order".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), ErrorCode::DatabaseNotFound);
    }

    #[tokio::test]
    async fn test_validation_error_has_field_details() {
        use validator::Validate;

        #[derive(Validate)]
        struct Input {
            #[validate(length(min = 3))]
            title: String,
        }

        let errors = Input { title: "ab".into() }.validate().unwrap_err();
        let (status, body) = body_of(AppError::from(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.details.unwrap().get("title").is_some());
    }
}

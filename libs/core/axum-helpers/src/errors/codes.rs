//! Error codes returned in every [`ErrorResponse`](super::ErrorResponse).
//!
//! Each code has a string identifier for clients, an integer for logs and a
//! default message:
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ValidationError;
//! assert_eq!(code.as_str(), "VALIDATION_ERROR");
//! assert_eq!(code.code(), 1001);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidUuid,
    JsonExtraction,
    NotFound,
    InternalError,
    Unauthorized,
    Forbidden,
    Conflict,
    UnprocessableEntity,
    BadRequest,
    ServiceUnavailable,
    PayloadTooLarge,

    DatabaseNotFound,
    DatabaseError,
    DatabaseUniqueViolation,
    DatabaseForeignKey,
    DatabasePoolTimeout,
    DatabaseUnhandled,

    IoError,
    SerdeJsonError,
    CsvError,
}

impl ErrorCode {
    /// `(identifier, integer, default message)`; integers are grouped as
    /// 1xxx request, 2xxx database, 4xxx I/O, 5xxx serialization
    const fn entry(self) -> (&'static str, i32, &'static str) {
        match self {
            Self::ValidationError => ("VALIDATION_ERROR", 1001, "Request validation failed"),
            Self::InvalidUuid => ("INVALID_UUID", 1002, "Invalid UUID format"),
            Self::JsonExtraction => ("JSON_EXTRACTION", 1003, "Failed to parse request body"),
            Self::NotFound => ("NOT_FOUND", 1004, "Resource not found"),
            Self::InternalError => ("INTERNAL_ERROR", 1005, "An internal server error occurred"),
            Self::Unauthorized => ("UNAUTHORIZED", 1006, "Authentication required"),
            Self::Forbidden => ("FORBIDDEN", 1007, "Access forbidden"),
            Self::Conflict => ("CONFLICT", 1008, "Resource already exists"),
            Self::UnprocessableEntity => {
                ("UNPROCESSABLE_ENTITY", 1009, "Request cannot be processed")
            }
            Self::BadRequest => ("BAD_REQUEST", 1010, "Bad request"),
            Self::ServiceUnavailable => (
                "SERVICE_UNAVAILABLE",
                1011,
                "Service is temporarily unavailable",
            ),
            Self::PayloadTooLarge => ("PAYLOAD_TOO_LARGE", 1012, "Request body is too large"),
            Self::DatabaseNotFound => ("DATABASE_NOT_FOUND", 2001, "Database record not found"),
            Self::DatabaseError => ("DATABASE_ERROR", 2003, "Database error occurred"),
            Self::DatabaseUniqueViolation => (
                "DATABASE_UNIQUE_VIOLATION",
                2004,
                "A record with the same unique value already exists",
            ),
            Self::DatabaseForeignKey => (
                "DATABASE_FOREIGN_KEY",
                2005,
                "Referenced record does not exist or is still in use",
            ),
            Self::DatabasePoolTimeout => (
                "DATABASE_POOL_TIMEOUT",
                2013,
                "Database connection pool timed out",
            ),
            Self::DatabaseUnhandled => ("DATABASE_UNHANDLED", 2099, "Unhandled database error"),
            Self::IoError => ("IO_ERROR", 4001, "I/O error occurred"),
            Self::SerdeJsonError => ("SERDE_JSON_ERROR", 5001, "JSON serialization error"),
            Self::CsvError => ("CSV_ERROR", 5002, "Malformed CSV input"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.entry().0
    }

    /// Integer code for structured logs
    pub fn code(&self) -> i32 {
        self.entry().1
    }

    pub fn default_message(&self) -> &'static str {
        self.entry().2
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_string_and_integer() {
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::DatabaseError.code(), 2003);
        assert_eq!(ErrorCode::Conflict.code(), 1008);
    }

    #[test]
    fn test_error_code_display_matches_serde() {
        let json = serde_json::to_string(&ErrorCode::DatabaseUniqueViolation).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorCode::DatabaseUniqueViolation));
    }

    #[test]
    fn test_error_code_deserialization() {
        let code: ErrorCode = serde_json::from_str("\"PAYLOAD_TOO_LARGE\"").unwrap();
        assert_eq!(code, ErrorCode::PayloadTooLarge);
    }
}

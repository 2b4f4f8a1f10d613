use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::RejectReason;

#[derive(Debug, Error)]
pub enum DiscountError {
    #[error("Discount not found: {0}")]
    NotFound(Uuid),

    #[error("Discount code '{0}' not found")]
    CodeNotFound(String),

    #[error("Discount code '{0}' already exists")]
    DuplicateCode(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{}", .0.message())]
    Rejected(RejectReason),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type DiscountResult<T> = Result<T, DiscountError>;

impl From<DiscountError> for AppError {
    fn from(err: DiscountError) -> Self {
        let message = err.to_string();
        match err {
            DiscountError::NotFound(_) | DiscountError::CodeNotFound(_) => {
                AppError::NotFound(message)
            }
            DiscountError::DuplicateCode(_) => AppError::Conflict(message),
            DiscountError::Validation(msg) => AppError::BadRequest(msg),
            DiscountError::Rejected(reason) => AppError::Rejected {
                reason: reason.to_string(),
                message,
            },
            DiscountError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for DiscountError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_rejection_carries_snake_case_reason() {
        match AppError::from(DiscountError::Rejected(RejectReason::UsageLimitReached)) {
            AppError::Rejected { reason, message } => {
                assert_eq!(reason, "usage_limit_reached");
                assert_eq!(message, "Discount code has been used up");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_code_is_404() {
        let err = AppError::from(DiscountError::CodeNotFound("NOPE".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}

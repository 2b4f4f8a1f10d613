use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Only pending or cancelled orders can be deleted (order is {0})")]
    NotDeletable(OrderStatus),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::NotFound(id) => AppError::NotFound(format!("Order {} not found", id)),
            OrderError::Validation(msg) => AppError::BadRequest(msg),
            OrderError::InvalidTransition { .. } => AppError::Rejected {
                reason: "invalid_transition".to_string(),
                message,
            },
            OrderError::NotDeletable(_) => AppError::Conflict(message),
            OrderError::Csv(e) => AppError::Csv(e),
            OrderError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_invalid_transition_is_rejected_with_reason() {
        let err = AppError::from(OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        match err {
            AppError::Rejected { reason, message } => {
                assert_eq!(reason, "invalid_transition");
                assert!(message.contains("pending"));
                assert!(message.contains("shipped"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_not_deletable_is_conflict() {
        let err = AppError::from(OrderError::NotDeletable(OrderStatus::Paid));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_is_404() {
        let err = AppError::from(OrderError::NotFound(Uuid::nil()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}

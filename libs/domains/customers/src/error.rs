use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("Customer not found: {0}")]
    NotFound(Uuid),

    #[error("Customer with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Contact message not found: {0}")]
    MessageNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid CSV: {0}")]
    InvalidCsv(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type CustomerResult<T> = Result<T, CustomerError>;

impl From<CustomerError> for AppError {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::NotFound(id) => AppError::NotFound(format!("Customer {} not found", id)),
            CustomerError::DuplicateEmail(email) => {
                AppError::Conflict(format!("Customer with email '{}' already exists", email))
            }
            CustomerError::MessageNotFound(id) => {
                AppError::NotFound(format!("Contact message {} not found", id))
            }
            CustomerError::Validation(msg) | CustomerError::InvalidCsv(msg) => {
                AppError::BadRequest(msg)
            }
            CustomerError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for CustomerError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

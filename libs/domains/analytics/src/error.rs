use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidRange(msg) => AppError::BadRequest(msg),
            AnalyticsError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AnalyticsError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Post not found: {0}")]
    PostNotFound(Uuid),

    #[error("Post not found: {0}")]
    PostSlugNotFound(String),

    #[error("FAQ not found: {0}")]
    FaqNotFound(Uuid),

    #[error("Unknown FAQ ids: {0:?}")]
    UnknownFaqs(Vec<Uuid>),

    #[error("Media asset not found: {0}")]
    MediaNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type ContentResult<T> = Result<T, ContentError>;

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::PostNotFound(id) => AppError::NotFound(format!("Post {} not found", id)),
            ContentError::PostSlugNotFound(slug) => {
                AppError::NotFound(format!("Post '{}' not found", slug))
            }
            ContentError::FaqNotFound(id) => AppError::NotFound(format!("FAQ {} not found", id)),
            ContentError::UnknownFaqs(ids) => AppError::NotFound(format!(
                "Unknown FAQ ids: {}",
                ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
            )),
            ContentError::MediaNotFound(id) => {
                AppError::NotFound(format!("Media asset {} not found", id))
            }
            ContentError::Validation(msg) => AppError::BadRequest(msg),
            ContentError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for ContentError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_unknown_faqs_is_not_found() {
        let err = AppError::from(ContentError::UnknownFaqs(vec![Uuid::nil()]));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_validation_is_bad_request() {
        let err = AppError::from(ContentError::Validation("duplicate ids".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

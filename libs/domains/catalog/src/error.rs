use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Product not found: {0}")]
    ProductSlugNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    #[error("Collection not found: {0}")]
    CollectionNotFound(Uuid),

    #[error("Product with SKU '{0}' already exists")]
    DuplicateSku(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Stock of product {product_id} would drop to {resulting}")]
    InsufficientStock { product_id: Uuid, resulting: i64 },

    #[error("Category {0} cannot be moved below itself or one of its descendants")]
    CategoryCycle(Uuid),

    #[error("Category {0} still has sub-categories")]
    CategoryHasChildren(Uuid),

    #[error("Unknown product ids: {0:?}")]
    UnknownProducts(Vec<Uuid>),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid CSV: {0}")]
    InvalidCsv(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::ProductNotFound(id) => {
                AppError::NotFound(format!("Product {} not found", id))
            }
            CatalogError::ProductSlugNotFound(slug) => {
                AppError::NotFound(format!("Product '{}' not found", slug))
            }
            CatalogError::CategoryNotFound(id) => {
                AppError::NotFound(format!("Category {} not found", id))
            }
            CatalogError::CollectionNotFound(id) => {
                AppError::NotFound(format!("Collection {} not found", id))
            }
            CatalogError::DuplicateSku(sku) => {
                AppError::Conflict(format!("Product with SKU '{}' already exists", sku))
            }
            CatalogError::Validation(msg) => AppError::BadRequest(msg),
            CatalogError::InsufficientStock { .. } => AppError::Rejected {
                reason: "insufficient_stock".to_string(),
                message,
            },
            CatalogError::CategoryCycle(_) => AppError::Rejected {
                reason: "category_cycle".to_string(),
                message,
            },
            CatalogError::CategoryHasChildren(_) => AppError::Conflict(message),
            CatalogError::UnknownProducts(ids) => AppError::NotFound(format!(
                "Unknown product ids: {}",
                ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
            )),
            CatalogError::InvalidQuery(msg) | CatalogError::InvalidCsv(msg) => {
                AppError::BadRequest(msg)
            }
            CatalogError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

use axum::{
    Json,
    extract::{Query, State},
};
use axum_helpers::errors::responses::BadRequestValidationResponse;
use std::sync::Arc;

use super::SEARCH_TAG;
use crate::error::CatalogResult;
use crate::models::{SearchQuery, SearchResults};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

/// Ranked keyword search over products, categories and collections
#[utoipa::path(
    get,
    path = "",
    tag = SEARCH_TAG,
    params(SearchQuery),
    responses(
        (status = 200, description = "Hits by score, then title", body = SearchResults),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn search<R: CatalogRepository>(
    State(service): State<Arc<CatalogService<R>>>,
    Query(params): Query<SearchQuery>,
) -> CatalogResult<Json<SearchResults>> {
    Ok(Json(service.search(params).await?))
}

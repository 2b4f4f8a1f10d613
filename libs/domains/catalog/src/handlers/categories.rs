use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::errors::responses::{
    BadRequestValidationResponse, ConflictResponse, NotFoundResponse, UnprocessableResponse,
};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use core_proc_macros::ApiResource;
use std::sync::Arc;

use crate::entity::category;
use crate::error::CatalogResult;
use crate::models::{Category, CategoryFilter, CategoryNode, CreateCategory, UpdateCategory};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

type Service<R> = State<Arc<CatalogService<R>>>;

#[utoipa::path(
    get,
    path = "/categories",
    tag = category::Model::TAG,
    params(CategoryFilter),
    responses((status = 200, description = "Categories by position, then name", body = Vec<Category>))
)]
pub(super) async fn list_categories<R: CatalogRepository>(
    State(service): Service<R>,
    Query(filter): Query<CategoryFilter>,
) -> CatalogResult<Json<Vec<Category>>> {
    Ok(Json(service.list_categories(filter).await?))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = category::Model::TAG,
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn create_category<R: CatalogRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreateCategory>,
) -> CatalogResult<impl IntoResponse> {
    let category = service.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/categories/tree",
    tag = category::Model::TAG,
    responses((status = 200, description = "Nested category tree", body = Vec<CategoryNode>))
)]
pub(super) async fn category_tree<R: CatalogRepository>(
    State(service): Service<R>,
) -> CatalogResult<Json<Vec<CategoryNode>>> {
    Ok(Json(service.category_tree().await?))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = category::Model::TAG,
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category found", body = Category),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_category<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Category>> {
    Ok(Json(service.get_category(id).await?))
}

#[utoipa::path(
    patch,
    path = "/categories/{id}",
    tag = category::Model::TAG,
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = UnprocessableResponse)
    )
)]
pub(super) async fn update_category<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateCategory>,
) -> CatalogResult<Json<Category>> {
    Ok(Json(service.update_category(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = category::Model::TAG,
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted; its products are detached"),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
pub(super) async fn delete_category<R: CatalogRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CatalogResult<StatusCode> {
    service.delete_category(id).await?;

    AuditEvent::by(&claims, "category.delete", format!("category:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}

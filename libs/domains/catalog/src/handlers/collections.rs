use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::PathRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::errors::responses::{
    BadRequestValidationResponse, NotFoundResponse,
};
use axum_helpers::{AppError, AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use core_proc_macros::ApiResource;
use std::sync::Arc;
use uuid::Uuid;

use crate::entity::collection;
use crate::error::CatalogResult;
use crate::models::{
    AddProducts, Collection, CollectionFilter, CreateCollection, MembershipChange, Product,
    UpdateCollection,
};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

type Service<R> = State<Arc<CatalogService<R>>>;

#[utoipa::path(
    get,
    path = "/collections",
    tag = collection::Model::TAG,
    params(CollectionFilter),
    responses((status = 200, description = "Collections by title", body = Vec<Collection>))
)]
pub(super) async fn list_collections<R: CatalogRepository>(
    State(service): Service<R>,
    Query(filter): Query<CollectionFilter>,
) -> CatalogResult<Json<Vec<Collection>>> {
    Ok(Json(service.list_collections(filter).await?))
}

#[utoipa::path(
    post,
    path = "/collections",
    tag = collection::Model::TAG,
    request_body = CreateCollection,
    responses(
        (status = 201, description = "Collection created", body = Collection),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn create_collection<R: CatalogRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreateCollection>,
) -> CatalogResult<impl IntoResponse> {
    let collection = service.create_collection(input).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

#[utoipa::path(
    get,
    path = "/collections/{id}",
    tag = collection::Model::TAG,
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Collection found", body = Collection),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_collection<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Collection>> {
    Ok(Json(service.get_collection(id).await?))
}

#[utoipa::path(
    patch,
    path = "/collections/{id}",
    tag = collection::Model::TAG,
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = UpdateCollection,
    responses(
        (status = 200, description = "Collection updated", body = Collection),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn update_collection<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateCollection>,
) -> CatalogResult<Json<Collection>> {
    Ok(Json(service.update_collection(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/collections/{id}",
    tag = collection::Model::TAG,
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 204, description = "Collection deleted; products are kept"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn delete_collection<R: CatalogRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CatalogResult<StatusCode> {
    service.delete_collection(id).await?;

    AuditEvent::by(&claims, "collection.delete", format!("collection:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/collections/{id}/products",
    tag = collection::Model::TAG,
    params(("id" = Uuid, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Member products by title", body = Vec<Product>),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn list_collection_products<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Vec<Product>>> {
    Ok(Json(service.list_collection_products(id).await?))
}

#[utoipa::path(
    post,
    path = "/collections/{id}/products",
    tag = collection::Model::TAG,
    params(("id" = Uuid, Path, description = "Collection ID")),
    request_body = AddProducts,
    responses(
        (status = 200, description = "Products added; existing members are ignored", body = MembershipChange),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn add_products<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AddProducts>,
) -> CatalogResult<Json<MembershipChange>> {
    Ok(Json(service.add_products(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/collections/{id}/products/{product_id}",
    tag = collection::Model::TAG,
    params(
        ("id" = Uuid, Path, description = "Collection ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product removed from the collection"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn remove_product<R: CatalogRepository>(
    State(service): Service<R>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path((id, product_id)) = path.map_err(|e| AppError::BadRequest(e.body_text()))?;
    service.remove_product(id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::csv_io::{CsvAttachment, ImportParams, ImportReport};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse, NotFoundResponse,
    UnprocessableResponse,
};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson, ValidatedQuery};
use chrono::Utc;
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;

use crate::entity::product;
use crate::error::CatalogResult;
use crate::models::{
    AdjustStock, CreateProduct, LowStockQuery, Product, ProductFilter, UpdateProduct,
};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

type Service<R> = State<Arc<CatalogService<R>>>;

#[utoipa::path(
    get,
    path = "/products",
    tag = product::Model::TAG,
    params(ProductFilter),
    responses(
        (status = 200, description = "Products, newest first", body = Vec<Product>)
    )
)]
pub(super) async fn list_products<R: CatalogRepository>(
    State(service): Service<R>,
    Query(filter): Query<ProductFilter>,
) -> CatalogResult<Json<Vec<Product>>> {
    Ok(Json(service.list_products(filter).await?))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = product::Model::TAG,
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
pub(super) async fn create_product<R: CatalogRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreateProduct>,
) -> CatalogResult<impl IntoResponse> {
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = product::Model::TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_product<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Product>> {
    Ok(Json(service.get_product(id).await?))
}

#[utoipa::path(
    get,
    path = "/products/by-slug/{slug}",
    tag = product::Model::TAG,
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_product_by_slug<R: CatalogRepository>(
    State(service): Service<R>,
    Path(slug): Path<String>,
) -> CatalogResult<Json<Product>> {
    Ok(Json(service.get_product_by_slug(&slug).await?))
}

#[utoipa::path(
    patch,
    path = "/products/{id}",
    tag = product::Model::TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse)
    )
)]
pub(super) async fn update_product<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateProduct>,
) -> CatalogResult<Json<Product>> {
    Ok(Json(service.update_product(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = product::Model::TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn delete_product<R: CatalogRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CatalogResult<StatusCode> {
    service.delete_product(id).await?;

    AuditEvent::by(&claims, "product.delete", format!("product:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/products/{id}/stock",
    tag = product::Model::TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AdjustStock,
    responses(
        (status = 200, description = "Stock adjusted", body = Product),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = UnprocessableResponse)
    )
)]
pub(super) async fn adjust_stock<R: CatalogRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AdjustStock>,
) -> CatalogResult<Json<Product>> {
    let details = json!({ "delta": input.delta, "reason": input.reason });
    let product = service.adjust_stock(id, input).await?;

    AuditEvent::by(&claims, "product.adjust_stock", format!("product:{id}"))
        .from_headers(&headers)
        .with_details(details)
        .log();

    Ok(Json(product))
}

#[utoipa::path(
    post,
    path = "/products/{id}/publish",
    tag = product::Model::TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product is active", body = Product),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn publish_product<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Product>> {
    Ok(Json(service.publish_product(id).await?))
}

#[utoipa::path(
    post,
    path = "/products/{id}/archive",
    tag = product::Model::TAG,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product is archived", body = Product),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn archive_product<R: CatalogRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CatalogResult<Json<Product>> {
    Ok(Json(service.archive_product(id).await?))
}

#[utoipa::path(
    get,
    path = "/products/low-stock",
    tag = product::Model::TAG,
    params(LowStockQuery),
    responses(
        (status = 200, description = "Non-archived products at or below the threshold", body = Vec<Product>),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn low_stock<R: CatalogRepository>(
    State(service): Service<R>,
    ValidatedQuery(query): ValidatedQuery<LowStockQuery>,
) -> CatalogResult<Json<Vec<Product>>> {
    Ok(Json(service.low_stock(query.threshold, query.limit).await?))
}

#[utoipa::path(
    get,
    path = "/products/export",
    tag = product::Model::TAG,
    params(ProductFilter),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv", body = String)
    )
)]
pub(super) async fn export_products<R: CatalogRepository>(
    State(service): Service<R>,
    Query(filter): Query<ProductFilter>,
) -> CatalogResult<CsvAttachment> {
    let body = service.export_products(filter).await?;
    let filename = format!("products-{}.csv", Utc::now().format("%Y%m%d"));
    Ok(CsvAttachment::new(filename, body))
}

#[utoipa::path(
    post,
    path = "/products/import",
    tag = product::Model::TAG,
    params(ImportParams),
    request_body(content = String, content_type = "text/csv", description = "CSV with a header row"),
    responses(
        (status = 200, description = "Per-row import outcome", body = ImportReport),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn import_products<R: CatalogRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    Query(params): Query<ImportParams>,
    body: Bytes,
) -> CatalogResult<Json<ImportReport>> {
    let report = service.import_products(&body, params.mode).await?;

    AuditEvent::by(&claims, "product.import", "products")
        .from_headers(&headers)
        .with_details(json!({
            "mode": params.mode,
            "total_rows": report.total_rows,
            "created": report.created,
            "updated": report.updated,
            "skipped": report.skipped,
        }))
        .log();

    Ok(Json(report))
}

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::errors::responses::{BadRequestValidationResponse, NotFoundResponse};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;

use crate::entity::media_asset;
use crate::error::ContentResult;
use crate::models::{MediaAsset, MediaFilter, RegisterMedia, UpdateMedia};
use crate::repository::ContentRepository;
use crate::service::ContentService;

type Service<R> = State<Arc<ContentService<R>>>;

#[utoipa::path(
    get,
    path = "/media",
    tag = media_asset::Model::TAG,
    params(MediaFilter),
    responses((status = 200, description = "Assets, newest first", body = Vec<MediaAsset>))
)]
pub(super) async fn list_media<R: ContentRepository>(
    State(service): Service<R>,
    Query(filter): Query<MediaFilter>,
) -> ContentResult<Json<Vec<MediaAsset>>> {
    Ok(Json(service.list_media(filter).await?))
}

/// Called by the upload flow once the file is in storage
#[utoipa::path(
    post,
    path = "/media",
    tag = media_asset::Model::TAG,
    request_body = RegisterMedia,
    responses(
        (status = 201, description = "Asset registered", body = MediaAsset),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn register_media<R: ContentRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<RegisterMedia>,
) -> ContentResult<impl IntoResponse> {
    let asset = service.register_media(input).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

#[utoipa::path(
    get,
    path = "/media/{id}",
    tag = media_asset::Model::TAG,
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset found", body = MediaAsset),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_media<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> ContentResult<Json<MediaAsset>> {
    Ok(Json(service.get_media(id).await?))
}

#[utoipa::path(
    patch,
    path = "/media/{id}",
    tag = media_asset::Model::TAG,
    params(("id" = Uuid, Path, description = "Asset ID")),
    request_body = UpdateMedia,
    responses(
        (status = 200, description = "Asset updated", body = MediaAsset),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn update_media<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateMedia>,
) -> ContentResult<Json<MediaAsset>> {
    Ok(Json(service.update_media(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/media/{id}",
    tag = media_asset::Model::TAG,
    params(("id" = Uuid, Path, description = "Asset ID")),
    responses(
        (status = 204, description = "Asset metadata deleted; the stored file is left alone"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn delete_media<R: ContentRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> ContentResult<StatusCode> {
    let asset = service.get_media(id).await?;
    service.delete_media(id).await?;

    AuditEvent::by(&claims, "media.delete", format!("media:{id}"))
        .from_headers(&headers)
        .with_details(json!({ "file_name": asset.file_name, "url": asset.url }))
        .log();

    Ok(StatusCode::NO_CONTENT)
}

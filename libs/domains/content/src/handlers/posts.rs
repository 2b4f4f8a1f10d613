use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::errors::responses::{BadRequestValidationResponse, NotFoundResponse};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;

use crate::entity::blog_post;
use crate::error::ContentResult;
use crate::models::{BlogPost, CreatePost, PostFilter, UpdatePost};
use crate::repository::ContentRepository;
use crate::service::ContentService;

type Service<R> = State<Arc<ContentService<R>>>;

#[utoipa::path(
    get,
    path = "/posts",
    tag = blog_post::Model::TAG,
    params(PostFilter),
    responses((status = 200, description = "Latest published first, then drafts", body = Vec<BlogPost>))
)]
pub(super) async fn list_posts<R: ContentRepository>(
    State(service): Service<R>,
    Query(filter): Query<PostFilter>,
) -> ContentResult<Json<Vec<BlogPost>>> {
    Ok(Json(service.list_posts(filter).await?))
}

#[utoipa::path(
    post,
    path = "/posts",
    tag = blog_post::Model::TAG,
    request_body = CreatePost,
    responses(
        (status = 201, description = "Post created", body = BlogPost),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn create_post<R: ContentRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreatePost>,
) -> ContentResult<impl IntoResponse> {
    let post = service.create_post(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = blog_post::Model::TAG,
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post found", body = BlogPost),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_post<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> ContentResult<Json<BlogPost>> {
    Ok(Json(service.get_post(id).await?))
}

#[utoipa::path(
    get,
    path = "/posts/by-slug/{slug}",
    tag = blog_post::Model::TAG,
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post found", body = BlogPost),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_post_by_slug<R: ContentRepository>(
    State(service): Service<R>,
    Path(slug): Path<String>,
) -> ContentResult<Json<BlogPost>> {
    Ok(Json(service.get_post_by_slug(&slug).await?))
}

#[utoipa::path(
    patch,
    path = "/posts/{id}",
    tag = blog_post::Model::TAG,
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePost,
    responses(
        (status = 200, description = "Post updated", body = BlogPost),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn update_post<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdatePost>,
) -> ContentResult<Json<BlogPost>> {
    Ok(Json(service.update_post(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    tag = blog_post::Model::TAG,
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn delete_post<R: ContentRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> ContentResult<StatusCode> {
    service.delete_post(id).await?;

    AuditEvent::by(&claims, "post.delete", format!("post:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/posts/{id}/publish",
    tag = blog_post::Model::TAG,
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post is published", body = BlogPost),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn publish_post<R: ContentRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> ContentResult<Json<BlogPost>> {
    let post = service.publish_post(id).await?;

    AuditEvent::by(&claims, "post.publish", format!("post:{id}"))
        .from_headers(&headers)
        .with_details(json!({ "slug": post.slug }))
        .log();

    Ok(Json(post))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/unpublish",
    tag = blog_post::Model::TAG,
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post is back in draft", body = BlogPost),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn unpublish_post<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> ContentResult<Json<BlogPost>> {
    Ok(Json(service.unpublish_post(id).await?))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/archive",
    tag = blog_post::Model::TAG,
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post is archived", body = BlogPost),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn archive_post<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> ContentResult<Json<BlogPost>> {
    Ok(Json(service.archive_post(id).await?))
}

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::errors::responses::{BadRequestValidationResponse, NotFoundResponse};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use core_proc_macros::ApiResource;
use std::sync::Arc;

use crate::entity::faq;
use crate::error::ContentResult;
use crate::models::{CreateFaq, Faq, FaqFilter, ReorderFaqs, UpdateFaq};
use crate::repository::ContentRepository;
use crate::service::ContentService;

type Service<R> = State<Arc<ContentService<R>>>;

#[utoipa::path(
    get,
    path = "/faqs",
    tag = faq::Model::TAG,
    params(FaqFilter),
    responses((status = 200, description = "FAQs in display order", body = Vec<Faq>))
)]
pub(super) async fn list_faqs<R: ContentRepository>(
    State(service): Service<R>,
    Query(filter): Query<FaqFilter>,
) -> ContentResult<Json<Vec<Faq>>> {
    Ok(Json(service.list_faqs(filter).await?))
}

#[utoipa::path(
    post,
    path = "/faqs",
    tag = faq::Model::TAG,
    request_body = CreateFaq,
    responses(
        (status = 201, description = "FAQ created", body = Faq),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn create_faq<R: ContentRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<CreateFaq>,
) -> ContentResult<impl IntoResponse> {
    let faq = service.create_faq(input).await?;
    Ok((StatusCode::CREATED, Json(faq)))
}

#[utoipa::path(
    post,
    path = "/faqs/reorder",
    tag = faq::Model::TAG,
    request_body = ReorderFaqs,
    responses(
        (status = 200, description = "All FAQs in their new order", body = Vec<Faq>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn reorder_faqs<R: ContentRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<ReorderFaqs>,
) -> ContentResult<Json<Vec<Faq>>> {
    Ok(Json(service.reorder_faqs(input).await?))
}

#[utoipa::path(
    get,
    path = "/faqs/{id}",
    tag = faq::Model::TAG,
    params(("id" = Uuid, Path, description = "FAQ ID")),
    responses(
        (status = 200, description = "FAQ found", body = Faq),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_faq<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> ContentResult<Json<Faq>> {
    Ok(Json(service.get_faq(id).await?))
}

#[utoipa::path(
    patch,
    path = "/faqs/{id}",
    tag = faq::Model::TAG,
    params(("id" = Uuid, Path, description = "FAQ ID")),
    request_body = UpdateFaq,
    responses(
        (status = 200, description = "FAQ updated", body = Faq),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn update_faq<R: ContentRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateFaq>,
) -> ContentResult<Json<Faq>> {
    Ok(Json(service.update_faq(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/faqs/{id}",
    tag = faq::Model::TAG,
    params(("id" = Uuid, Path, description = "FAQ ID")),
    responses(
        (status = 204, description = "FAQ deleted"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn delete_faq<R: ContentRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> ContentResult<StatusCode> {
    service.delete_faq(id).await?;

    AuditEvent::by(&claims, "faq.delete", format!("faq:{id}"))
        .from_headers(&headers)
        .log();

    Ok(StatusCode::NO_CONTENT)
}

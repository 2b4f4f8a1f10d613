use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, NotFoundResponse,
};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;

use crate::entity::contact_message;
use crate::error::CustomerResult;
use crate::models::{ContactFilter, ContactMessage, SetContactStatus, SubmitContact, UnreadCount};
use crate::repository::ContactRepository;
use crate::service::ContactService;

type Service<R> = State<Arc<ContactService<R>>>;

#[utoipa::path(
    post,
    path = "",
    tag = contact_message::Model::TAG,
    request_body = SubmitContact,
    security(()),
    responses(
        (status = 201, description = "Message received", body = ContactMessage),
        (status = 400, response = BadRequestValidationResponse)
    )
)]
pub(super) async fn submit<R: ContactRepository>(
    State(service): Service<R>,
    ValidatedJson(input): ValidatedJson<SubmitContact>,
) -> CustomerResult<impl IntoResponse> {
    let message = service.submit(input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "",
    tag = contact_message::Model::TAG,
    params(ContactFilter),
    responses(
        (status = 200, description = "Messages, newest first", body = Vec<ContactMessage>)
    )
)]
pub(super) async fn list_messages<R: ContactRepository>(
    State(service): Service<R>,
    Query(filter): Query<ContactFilter>,
) -> CustomerResult<Json<Vec<ContactMessage>>> {
    Ok(Json(service.list_messages(filter).await?))
}

#[utoipa::path(
    get,
    path = "/unread-count",
    tag = contact_message::Model::TAG,
    responses(
        (status = 200, description = "Messages still marked new", body = UnreadCount)
    )
)]
pub(super) async fn unread_count<R: ContactRepository>(
    State(service): Service<R>,
) -> CustomerResult<Json<UnreadCount>> {
    Ok(Json(service.unread_count().await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = contact_message::Model::TAG,
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message found", body = ContactMessage),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_message<R: ContactRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
) -> CustomerResult<Json<ContactMessage>> {
    Ok(Json(service.get_message(id).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/status",
    tag = contact_message::Model::TAG,
    params(("id" = Uuid, Path, description = "Message ID")),
    request_body = SetContactStatus,
    responses(
        (status = 200, description = "Status changed", body = ContactMessage),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn set_status<R: ContactRepository>(
    State(service): Service<R>,
    UuidPath(id): UuidPath,
    Json(input): Json<SetContactStatus>,
) -> CustomerResult<Json<ContactMessage>> {
    Ok(Json(service.set_status(id, input.status).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = contact_message::Model::TAG,
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn delete_message<R: ContactRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> CustomerResult<StatusCode> {
    let message = service.get_message(id).await?;
    service.delete_message(id).await?;

    AuditEvent::by(&claims, "contact_message.delete", format!("contact_message:{id}"))
        .from_headers(&headers)
        .with_details(json!({ "email": message.email }))
        .log();

    Ok(StatusCode::NO_CONTENT)
}

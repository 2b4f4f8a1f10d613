use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse, NotFoundResponse,
    UnprocessableResponse,
};
use axum_helpers::{AuditEvent, JwtClaims, UuidPath, ValidatedJson};
use core_proc_macros::ApiResource;
use serde_json::json;
use std::sync::Arc;

use super::identity;
use crate::entity::support_thread;
use crate::error::{MessagingError, MessagingResult};
use crate::hub::HubStats;
use crate::models::{
    CreateThread, MarkRead, Message, MessagePage, ReadReceipt, SendMessage, Thread, ThreadFilter,
    UnreadThread, UpdateThread,
};
use crate::repository::MessagingRepository;
use crate::service::MessagingService;

type Service<R> = State<Arc<MessagingService<R>>>;

#[utoipa::path(
    get,
    path = "/threads",
    tag = support_thread::Model::TAG,
    params(ThreadFilter),
    responses(
        (status = 200, description = "Threads by latest activity; customers only see their own", body = Vec<Thread>)
    )
)]
pub(super) async fn list_threads<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    Query(filter): Query<ThreadFilter>,
) -> MessagingResult<Json<Vec<Thread>>> {
    let identity = identity(&claims)?;
    Ok(Json(service.list_threads(&identity, filter).await?))
}

#[utoipa::path(
    post,
    path = "/threads",
    tag = support_thread::Model::TAG,
    request_body = CreateThread,
    responses(
        (status = 201, description = "Thread opened and assigned to the caller", body = Thread),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse)
    )
)]
pub(super) async fn open_thread<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(input): ValidatedJson<CreateThread>,
) -> MessagingResult<impl IntoResponse> {
    let identity = identity(&claims)?;
    let thread = service.open_thread(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

#[utoipa::path(
    get,
    path = "/threads/{id}",
    tag = support_thread::Model::TAG,
    params(("id" = Uuid, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread found", body = Thread),
        (status = 400, response = BadRequestUuidResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn get_thread<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(id): UuidPath,
) -> MessagingResult<Json<Thread>> {
    let identity = identity(&claims)?;
    Ok(Json(service.get_thread(&identity, id).await?))
}

#[utoipa::path(
    patch,
    path = "/threads/{id}",
    tag = support_thread::Model::TAG,
    params(("id" = Uuid, Path, description = "Thread ID")),
    request_body = UpdateThread,
    responses(
        (status = 200, description = "Thread updated", body = Thread),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn update_thread<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
    Json(update): Json<UpdateThread>,
) -> MessagingResult<Json<Thread>> {
    let identity = identity(&claims)?;
    let thread = service.update_thread(&identity, id, update).await?;

    AuditEvent::by(&claims, "thread.update", format!("thread:{id}"))
        .from_headers(&headers)
        .with_details(json!({
            "status": thread.status,
            "assigned_to": thread.assigned_to,
        }))
        .log();

    Ok(Json(thread))
}

#[utoipa::path(
    get,
    path = "/threads/{id}/messages",
    tag = support_thread::Model::TAG,
    params(("id" = Uuid, Path, description = "Thread ID"), MessagePage),
    responses(
        (status = 200, description = "Messages, newest first", body = Vec<Message>),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn list_messages<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(id): UuidPath,
    Query(page): Query<MessagePage>,
) -> MessagingResult<Json<Vec<Message>>> {
    let identity = identity(&claims)?;
    Ok(Json(service.list_messages(&identity, id, page).await?))
}

#[utoipa::path(
    post,
    path = "/threads/{id}/messages",
    tag = support_thread::Model::TAG,
    params(("id" = Uuid, Path, description = "Thread ID")),
    request_body = SendMessage,
    responses(
        (status = 201, description = "Message stored and pushed to connected participants", body = Message),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = UnprocessableResponse)
    )
)]
pub(super) async fn send_message<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<SendMessage>,
) -> MessagingResult<impl IntoResponse> {
    let identity = identity(&claims)?;
    let message = service.send_message(&identity, id, input, None).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    post,
    path = "/threads/{id}/read",
    tag = support_thread::Model::TAG,
    params(("id" = Uuid, Path, description = "Thread ID")),
    request_body(content = Option<MarkRead>, description = "Defaults to the latest message"),
    responses(
        (status = 200, description = "Caller's deliveries marked read", body = ReadReceipt),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
pub(super) async fn mark_read<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(id): UuidPath,
    input: Option<Json<MarkRead>>,
) -> MessagingResult<Json<ReadReceipt>> {
    let identity = identity(&claims)?;
    let up_to = input.and_then(|Json(body)| body.up_to);
    Ok(Json(service.mark_read(&identity, id, up_to).await?))
}

#[utoipa::path(
    get,
    path = "/unread",
    tag = support_thread::Model::TAG,
    responses(
        (status = 200, description = "Unread counts of the caller, per thread", body = Vec<UnreadThread>)
    )
)]
pub(super) async fn unread<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
) -> MessagingResult<Json<Vec<UnreadThread>>> {
    let identity = identity(&claims)?;
    Ok(Json(service.unread(&identity).await?))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = support_thread::Model::TAG,
    responses(
        (status = 200, description = "Gateway counters", body = HubStats),
        (status = 403, response = ForbiddenResponse)
    )
)]
pub(super) async fn stats<R: MessagingRepository>(
    State(service): Service<R>,
    Extension(claims): Extension<JwtClaims>,
) -> MessagingResult<Json<HubStats>> {
    if !identity(&claims)?.is_agent() {
        return Err(MessagingError::Forbidden(
            "Only support agents can view gateway stats".to_string(),
        ));
    }
    Ok(Json(service.stats()))
}

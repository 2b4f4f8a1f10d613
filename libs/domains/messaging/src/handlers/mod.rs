mod socket;
mod support;
mod threads;

use axum::{
    Router,
    routing::{get, post},
};
use axum_helpers::errors::responses::{
    BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse,
    InternalServerErrorResponse, NotFoundResponse, ServiceUnavailableResponse,
    UnauthorizedResponse, UnprocessableResponse,
};
use axum_helpers::{AuthError, JwtClaims};
use core_proc_macros::ApiResource;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::entity::support_thread;
use crate::error::MessagingResult;
use crate::hub::HubStats;
use crate::models::{
    Attachment, ConversationStarted, CreateThread, DeliveryStatus, Identity, MarkRead, Message,
    ParticipantRole, ReadReceipt, SendMessage, StartConversation, Thread, ThreadStatus,
    UnreadThread, UpdateThread,
};
use crate::repository::MessagingRepository;
use crate::service::MessagingService;

pub const SUPPORT_TAG: &str = "Support";

#[derive(OpenApi)]
#[openapi(
    paths(
        threads::list_threads,
        threads::open_thread,
        threads::get_thread,
        threads::update_thread,
        threads::list_messages,
        threads::send_message,
        threads::mark_read,
        threads::unread,
        threads::stats,
        socket::connect,
    ),
    components(
        schemas(
            Thread, ThreadStatus, CreateThread, UpdateThread,
            Message, Attachment, SendMessage, MarkRead, ReadReceipt,
            DeliveryStatus, ParticipantRole, UnreadThread, HubStats
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ForbiddenResponse,
            UnprocessableResponse,
            UnauthorizedResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = support_thread::Model::TAG, description = "Support threads, messages and the live gateway")
    )
)]
pub struct ApiDoc;

/// The storefront entry point into support chat
#[derive(OpenApi)]
#[openapi(
    paths(support::start_conversation),
    components(schemas(StartConversation, ConversationStarted, Thread, ThreadStatus)),
    tags((name = SUPPORT_TAG, description = "Storefront support conversations"))
)]
pub struct SupportApiDoc;

/// Identity of an authenticated request
fn identity(claims: &JwtClaims) -> MessagingResult<Identity> {
    Identity::from_claims(claims)
        .ok_or_else(|| AuthError::InvalidToken("subject is not a UUID".to_string()).into())
}

/// Mounted under `/messaging` behind the JWT layer; customers and agents
/// both get through, the service applies the role rules
pub fn router<R: MessagingRepository + 'static>(service: MessagingService<R>) -> Router {
    Router::new()
        .route(
            "/threads",
            get(threads::list_threads).post(threads::open_thread),
        )
        .route(
            "/threads/{id}",
            get(threads::get_thread).patch(threads::update_thread),
        )
        .route(
            "/threads/{id}/messages",
            get(threads::list_messages).post(threads::send_message),
        )
        .route("/threads/{id}/read", post(threads::mark_read))
        .route("/unread", get(threads::unread))
        .route("/stats", get(threads::stats))
        .with_state(Arc::new(service))
}

/// `/ws`, authenticated by the handler itself so browsers can pass the
/// token as a query parameter
pub fn gateway_router<R: MessagingRepository + 'static>(service: MessagingService<R>) -> Router {
    Router::new()
        .route("/ws", get(socket::connect))
        .with_state(Arc::new(service))
}

/// Unauthenticated, mounted under `/support`
pub fn support_router<R: MessagingRepository + 'static>(service: MessagingService<R>) -> Router {
    Router::new()
        .route("/conversations", post(support::start_conversation))
        .with_state(Arc::new(service))
}

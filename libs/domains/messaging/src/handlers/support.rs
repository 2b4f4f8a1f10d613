use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_helpers::ValidatedJson;
use axum_helpers::errors::responses::{BadRequestValidationResponse, ServiceUnavailableResponse};
use std::sync::Arc;

use super::SUPPORT_TAG;
use crate::error::MessagingResult;
use crate::models::{ConversationStarted, StartConversation};
use crate::repository::MessagingRepository;
use crate::service::MessagingService;

#[utoipa::path(
    post,
    path = "/conversations",
    tag = SUPPORT_TAG,
    request_body = StartConversation,
    security(()),
    responses(
        (status = 201, description = "Thread opened; `token` authenticates the gateway", body = ConversationStarted),
        (status = 400, response = BadRequestValidationResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
pub(super) async fn start_conversation<R: MessagingRepository>(
    State(service): State<Arc<MessagingService<R>>>,
    ValidatedJson(input): ValidatedJson<StartConversation>,
) -> MessagingResult<impl IntoResponse> {
    let started = service.start_conversation(input).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

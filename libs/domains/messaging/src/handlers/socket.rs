use axum::{
    extract::{
        Query, State,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::HeaderMap,
    response::Response,
};
use axum_helpers::AuthError;
use axum_helpers::auth::extract_token_from_request;
use axum_helpers::errors::responses::{ServiceUnavailableResponse, UnauthorizedResponse};
use core_proc_macros::ApiResource;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::entity::support_thread;
use crate::error::{MessagingError, MessagingResult};
use crate::gateway;
use crate::repository::MessagingRepository;
use crate::service::MessagingService;

#[derive(Debug, Deserialize, IntoParams)]
pub(super) struct GatewayQuery {
    /// Access token, for clients that cannot set headers
    token: Option<String>,
}

/// Token from `?token=`, the `Authorization` header or the access cookie.
/// Checked before the upgrade, as is the connection limit.
#[utoipa::path(
    get,
    path = "/ws",
    tag = support_thread::Model::TAG,
    params(GatewayQuery),
    security(()),
    responses(
        (status = 101, description = "Switched to the JSON event protocol"),
        (status = 401, response = UnauthorizedResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
pub(super) async fn connect<R: MessagingRepository + 'static>(
    State(service): State<Arc<MessagingService<R>>>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> MessagingResult<Response> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| extract_token_from_request(&headers))
        .ok_or(AuthError::MissingToken)?;
    let identity = service.authenticate(&token).await?;

    if service.hub().is_full() {
        tracing::warn!(user_id = %identity.user_id, "Socket refused, connection limit reached");
        return Err(MessagingError::AtCapacity);
    }

    let upgrade = upgrade.map_err(|e| MessagingError::Validation(e.body_text()))?;
    Ok(upgrade.on_upgrade(move |socket| gateway::run_session(service, identity, socket)))
}

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::from_fn_with_state,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};
use axum_helpers::{
    AppError, AuditEvent, AuditOutcome, AuthError, JwtClaims, SharedAuthority, ValidatedJson,
    auth::{
        ACCESS_COOKIE, REFRESH_COOKIE, auth_cookie, clear_cookie, cookie_value,
        extract_token_from_request,
    },
    errors::responses::{BadRequestValidationResponse, UnauthorizedResponse},
    jwt_auth_middleware,
};
use serde_json::json;
use utoipa::OpenApi;

use crate::error::{UserError, UserResult};
use crate::models::{LoginRequest, LoginResponse, RefreshRequest, TokenResponse, User};
use crate::repository::UserRepository;
use crate::service::UserService;

const TAG: &str = "Auth";

#[derive(OpenApi)]
#[openapi(
    paths(login, logout, refresh, me),
    components(
        schemas(LoginRequest, LoginResponse, TokenResponse, RefreshRequest),
        responses(BadRequestValidationResponse, UnauthorizedResponse)
    ),
    tags((name = TAG, description = "Staff login, logout and token refresh"))
)]
pub struct ApiDoc;

/// State shared by the auth endpoints
pub struct AuthState<R: UserRepository> {
    pub service: UserService<R>,
    pub authority: SharedAuthority,
    /// Adds `Secure` to the auth cookies (HTTPS deployments)
    pub secure_cookies: bool,
}

impl<R: UserRepository> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            authority: self.authority.clone(),
            secure_cookies: self.secure_cookies,
        }
    }
}

/// `/auth` routes; only `/me` requires a token.
pub fn router<R: UserRepository + 'static>(state: AuthState<R>) -> Router {
    let protected = Router::new()
        .route("/me", get(me::<R>))
        .route_layer(from_fn_with_state(
            state.authority.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .route("/login", post(login::<R>))
        .route("/logout", post(logout::<R>))
        .route("/refresh", post(refresh::<R>))
        .merge(protected)
        .with_state(state)
}

/// Exchange email and password for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/login",
    tag = TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; tokens also set as cookies", body = LoginResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn login<R: UserRepository>(
    State(state): State<AuthState<R>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> UserResult<Response> {
    let user = match state.service.verify_credentials(&input.email, &input.password).await {
        Ok(user) => user,
        Err(UserError::InvalidCredentials) => {
            AuditEvent::new(
                None,
                "auth.login",
                Some(format!("email:{}", input.email.trim().to_lowercase())),
                AuditOutcome::Denied,
            )
            .from_headers(&headers)
            .log();
            return Err(UserError::InvalidCredentials);
        }
        Err(e) => return Err(e),
    };

    let pair = state.authority.issue_pair(&user.token_subject()).await?;
    let expires_in = pair.access.claims.exp - pair.access.claims.iat;

    AuditEvent::new(
        Some(user.id.to_string()),
        "auth.login",
        Some(format!("user:{}", user.id)),
        AuditOutcome::Success,
    )
    .from_headers(&headers)
    .log();

    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            auth_cookie(ACCESS_COOKIE, &pair.access.token, expires_in, state.secure_cookies),
        ),
        (
            header::SET_COOKIE,
            auth_cookie(
                REFRESH_COOKIE,
                &pair.refresh.token,
                pair.refresh.claims.exp - pair.refresh.claims.iat,
                state.secure_cookies,
            ),
        ),
    ]);

    let body = LoginResponse {
        user,
        access_token: pair.access.token,
        expires_in,
    };

    Ok((cookies, Json(body)).into_response())
}

/// Revoke the presented access and refresh tokens and clear the cookies
#[utoipa::path(
    post,
    path = "/logout",
    tag = TAG,
    request_body(content = RefreshRequest, description = "Refresh token when not sent as cookie"),
    responses((status = 204, description = "Logged out"))
)]
async fn logout<R: UserRepository>(
    State(state): State<AuthState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> UserResult<Response> {
    let access = extract_token_from_request(&headers);
    let refresh = refresh_token_from(&headers, &body)?;

    let mut user_id = None;
    if let Some(ref token) = access {
        user_id = state.authority.authenticate(token).await.ok().map(|c| c.sub);
        state.authority.revoke(token).await?;
    }
    if let Some(ref token) = refresh {
        state.authority.revoke(token).await?;
    }

    AuditEvent::new(user_id, "auth.logout", None, AuditOutcome::Success)
        .from_headers(&headers)
        .log();

    let cookies = AppendHeaders([
        (header::SET_COOKIE, clear_cookie(ACCESS_COOKIE, state.secure_cookies)),
        (header::SET_COOKIE, clear_cookie(REFRESH_COOKIE, state.secure_cookies)),
    ]);

    Ok((StatusCode::NO_CONTENT, cookies).into_response())
}

/// Trade a live refresh token for a new pair; the old refresh token is revoked
#[utoipa::path(
    post,
    path = "/refresh",
    tag = TAG,
    request_body(content = RefreshRequest, description = "Refresh token when not sent as cookie"),
    responses(
        (status = 200, description = "New access token; both cookies rotated", body = TokenResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn refresh<R: UserRepository>(
    State(state): State<AuthState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> UserResult<Response> {
    let token = refresh_token_from(&headers, &body)?.ok_or(AuthError::MissingToken)?;
    let pair = state.authority.refresh(&token).await?;

    // Accounts deactivated since login stop refreshing
    if let Some(user_id) = pair.access.claims.user_id() {
        let user = state.service.get_user(user_id).await;
        if !matches!(user, Ok(ref u) if u.is_active) {
            state.authority.revoke(&pair.access.token).await?;
            state.authority.revoke(&pair.refresh.token).await?;
            return Err(AuthError::Revoked.into());
        }
    }

    let expires_in = pair.access.claims.exp - pair.access.claims.iat;
    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            auth_cookie(ACCESS_COOKIE, &pair.access.token, expires_in, state.secure_cookies),
        ),
        (
            header::SET_COOKIE,
            auth_cookie(
                REFRESH_COOKIE,
                &pair.refresh.token,
                pair.refresh.claims.exp - pair.refresh.claims.iat,
                state.secure_cookies,
            ),
        ),
    ]);

    let body = TokenResponse {
        access_token: pair.access.token,
        expires_in,
    };
    Ok((cookies, Json(body)).into_response())
}

/// Current staff account
#[utoipa::path(
    get,
    path = "/me",
    tag = TAG,
    responses(
        (status = 200, description = "Authenticated account", body = User),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn me<R: UserRepository>(
    State(state): State<AuthState<R>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<User>, AppError> {
    let id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Token subject is not a staff account".into()))?;

    match state.service.get_user(id).await {
        Ok(user) => Ok(Json(user)),
        Err(UserError::NotFound(_)) => Err(AppError::Unauthorized(
            "Account no longer exists".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Refresh token from a JSON body `{ "refresh_token": ... }` or the cookie
fn refresh_token_from(headers: &HeaderMap, body: &Bytes) -> UserResult<Option<String>> {
    if !body.is_empty() {
        let request: RefreshRequest = serde_json::from_slice(body)
            .map_err(|e| UserError::Validation(format!("Invalid request body: {}", e)))?;
        if let Some(token) = request.refresh_token.filter(|t| !t.is_empty()) {
            return Ok(Some(token));
        }
    }
    Ok(cookie_value(headers, REFRESH_COOKIE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_token_prefers_body() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "refresh_token=from-cookie".parse().unwrap());

        let body = Bytes::from_static(br#"{"refresh_token":"from-body"}"#);
        assert_eq!(
            refresh_token_from(&headers, &body).unwrap().as_deref(),
            Some("from-body")
        );
        assert_eq!(
            refresh_token_from(&headers, &Bytes::new()).unwrap().as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_refresh_token_rejects_malformed_body() {
        let err = refresh_token_from(&HeaderMap::new(), &Bytes::from_static(b"{")).unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));
    }
}

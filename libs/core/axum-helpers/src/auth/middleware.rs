use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use super::{ACCESS_COOKIE, AuthError, JwtClaims, SharedAuthority};
use crate::errors::AppError;

/// Value of cookie `name` from the `Cookie` header
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

/// `Authorization: Bearer <token>` first, then the `access_token` cookie
pub fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| cookie_value(headers, ACCESS_COOKIE))
}

/// Rejects requests without a live access token and stores its
/// [`JwtClaims`] in the request extensions.
///
/// ```ignore
/// let protected = Router::new()
///     .route("/orders", get(list_orders))
///     .layer(axum::middleware::from_fn_with_state(authority.clone(), jwt_auth_middleware));
/// ```
pub async fn jwt_auth_middleware(
    State(auth): State<SharedAuthority>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_request(request.headers()).ok_or_else(|| {
        tracing::debug!("No JWT found in Authorization header or cookie");
        AuthError::MissingToken
    })?;

    let claims = auth.authenticate(&token).await.inspect_err(|e| {
        tracing::debug!(error = %e, "JWT rejected");
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Roles accepted by [`require_roles`]; any one of them is enough.
#[derive(Clone, Copy, Debug)]
pub struct RequireRoles(pub &'static [&'static str]);

/// Must run inside [`jwt_auth_middleware`].
///
/// ```ignore
/// let admin_only = users_router
///     .layer(from_fn_with_state(RequireRoles(&["admin"]), require_roles))
///     .layer(from_fn_with_state(authority, jwt_auth_middleware));
/// ```
pub async fn require_roles(
    State(RequireRoles(roles)): State<RequireRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<JwtClaims>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    if !claims.has_any_role(roles) {
        tracing::info!(user_id = %claims.sub, required = ?roles, "Insufficient role");
        return Err(AppError::Forbidden(format!(
            "Requires role: {}",
            roles.join(" or ")
        )));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtCodec, JwtConfig, TokenAuthority, TokenSubject};
    use axum::{
        Extension, Router,
        body::Body,
        http::{HeaderValue, Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn authority() -> SharedAuthority {
        Arc::new(JwtCodec::new(
            &JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap(),
        ))
    }

    async fn token_with(auth: &SharedAuthority, roles: &[&str]) -> String {
        let subject = TokenSubject {
            user_id: Uuid::now_v7(),
            email: "staff@shop.test".into(),
            name: "Staff".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        auth.issue_access_token(&subject).await.unwrap().token
    }

    fn app(auth: SharedAuthority) -> Router {
        Router::new()
            .route(
                "/me",
                get(|Extension(claims): Extension<JwtClaims>| async move { claims.email }),
            )
            .route(
                "/admin",
                get(|| async { "ok" })
                    .layer(from_fn_with_state(RequireRoles(&["admin"]), require_roles)),
            )
            .layer(from_fn_with_state(auth, jwt_auth_middleware))
    }

    #[test]
    fn test_extract_prefers_bearer_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; access_token=from-cookie"));
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_cookie_value_ignores_similar_names() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("x_access_token=a; refresh_token=b"));
        assert_eq!(cookie_value(&headers, ACCESS_COOKIE), None);
        assert_eq!(cookie_value(&headers, "refresh_token").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let response = app(authority())
            .oneshot(HttpRequest::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let auth = authority();
        let token = token_with(&auth, &["support"]).await;
        let response = app(auth)
            .oneshot(
                HttpRequest::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_gate() {
        let auth = authority();
        let support = token_with(&auth, &["support"]).await;
        let admin = token_with(&auth, &["admin"]).await;
        let app = app(auth);

        let denied = app
            .clone()
            .oneshot(
                HttpRequest::get("/admin")
                    .header(header::AUTHORIZATION, format!("Bearer {support}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let allowed = app
            .oneshot(
                HttpRequest::get("/admin")
                    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}

use axum::{Router, middleware::from_fn_with_state};
use axum_helpers::{RequireRoles, SharedAuthority, jwt_auth_middleware, require_roles};
use core_proc_macros::ApiResource;

use crate::state::AppState;

pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod content;
pub mod customers;
pub mod discounts;
pub mod health;
pub mod messaging;
pub mod orders;
pub mod users;

/// Every staff role; customer chat tokens carry none of these
pub const STAFF_ROLES: &[&str] = &["admin", "manager", "support"];
pub const ADMIN_ROLES: &[&str] = &["admin"];

/// Any valid access token, staff or customer
fn authenticated(router: Router, authority: &SharedAuthority) -> Router {
    router.layer(from_fn_with_state(authority.clone(), jwt_auth_middleware))
}

/// A valid access token carrying one of `roles`
fn with_roles(router: Router, authority: &SharedAuthority, roles: &'static [&'static str]) -> Router {
    authenticated(
        router.layer(from_fn_with_state(RequireRoles(roles), require_roles)),
        authority,
    )
}

/// API routes without the `/api` prefix, which `create_router` adds.
///
/// Public: `/auth` (its `/me` checks the token itself), `/contact`,
/// `/support` and the `/messaging/ws` handshake. Messaging REST takes any
/// token; everything else is staff only and `/users` admin only.
pub fn routes(state: &AppState) -> Router {
    let authority = &state.authority;
    let staff = |router: Router| with_roles(router, authority, STAFF_ROLES);

    let catalog = catalog::service(state);
    let contact = customers::contact_service(state);
    let messaging = messaging::service(state);

    Router::new()
        .nest("/auth", auth::router(state))
        .nest(
            domain_users::entity::Model::URL,
            with_roles(users::router(state), authority, ADMIN_ROLES),
        )
        .nest(
            "/catalog",
            staff(domain_catalog::handlers::router(catalog.clone())),
        )
        .nest(
            "/search",
            staff(domain_catalog::handlers::search_router(catalog)),
        )
        .nest(domain_orders::entity::Model::URL, staff(orders::router(state)))
        .nest("/content", staff(content::router(state)))
        .nest(
            domain_customers::entity::customer::Model::URL,
            staff(customers::router(state)),
        )
        .nest(
            domain_customers::entity::contact_message::Model::URL,
            staff(domain_customers::handlers::contact_router(contact.clone())),
        )
        .nest(
            "/contact",
            domain_customers::handlers::public_contact_router(contact),
        )
        .nest(
            domain_discounts::entity::Model::URL,
            staff(discounts::router(state)),
        )
        .nest("/analytics", staff(analytics::router(state)))
        .nest(
            "/messaging",
            authenticated(
                domain_messaging::handlers::router(messaging.clone()),
                authority,
            )
            .merge(domain_messaging::handlers::gateway_router(messaging.clone())),
        )
        .nest(
            "/support",
            domain_messaging::handlers::support_router(messaging),
        )
}

/// `/ready` with real Postgres and Redis checks, merged next to `/health`
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum_helpers::{JwtCodec, JwtConfig, TokenAuthority, TokenSubject};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn authority() -> SharedAuthority {
        Arc::new(JwtCodec::new(
            &JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap(),
        ))
    }

    async fn token(authority: &SharedAuthority, roles: &[&str]) -> String {
        authority
            .issue_access_token(&TokenSubject {
                user_id: Uuid::now_v7(),
                email: "someone@shop.test".into(),
                name: "Someone".into(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            })
            .await
            .unwrap()
            .token
    }

    async fn status(router: Router, token: Option<String>) -> StatusCode {
        let mut request = Request::builder().uri("/ping");
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    fn ping() -> Router {
        Router::new().route("/ping", get(|| async { "pong" }))
    }

    #[tokio::test]
    async fn test_staff_routes_reject_customer_tokens() {
        let authority = authority();
        let staff = with_roles(ping(), &authority, STAFF_ROLES);

        assert_eq!(status(staff.clone(), None).await, StatusCode::UNAUTHORIZED);
        let customer = token(&authority, &["customer"]).await;
        assert_eq!(status(staff.clone(), Some(customer)).await, StatusCode::FORBIDDEN);
        let support = token(&authority, &["support"]).await;
        assert_eq!(status(staff, Some(support)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes() {
        let authority = authority();
        let admin_only = with_roles(ping(), &authority, ADMIN_ROLES);

        let manager = token(&authority, &["manager"]).await;
        assert_eq!(status(admin_only.clone(), Some(manager)).await, StatusCode::FORBIDDEN);
        let admin = token(&authority, &["admin", "support"]).await;
        assert_eq!(status(admin_only, Some(admin)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_messaging_accepts_any_token() {
        let authority = authority();
        let chat = authenticated(ping(), &authority);

        let customer = token(&authority, &["customer"]).await;
        assert_eq!(status(chat.clone(), Some(customer)).await, StatusCode::OK);
        assert_eq!(status(chat, None).await, StatusCode::UNAUTHORIZED);
    }
}

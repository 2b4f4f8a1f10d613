//! Handler tests for the users domain
//!
//! The routers run over the in-memory repository with a stateless JWT codec;
//! the Postgres repository is covered against a testcontainers database.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::{Extension, Router};
use axum_helpers::{JwtClaims, JwtCodec, JwtConfig, SharedAuthority, TokenAuthority, TokenKind};
use domain_users::*;
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use test_utils::{TestDataBuilder, TestDatabase};
use tower::ServiceExt;
use uuid::Uuid;

async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn authority() -> SharedAuthority {
    Arc::new(JwtCodec::new(
        &JwtConfig::new("test-secret-test-secret-test-secret").unwrap(),
    ))
}

fn admin_claims() -> JwtClaims {
    JwtClaims {
        sub: Uuid::now_v7().to_string(),
        email: "root@shop.test".into(),
        name: "Root".into(),
        roles: vec!["admin".into()],
        exp: i64::MAX,
        iat: 0,
        jti: Uuid::new_v4().to_string(),
        kind: TokenKind::Access,
    }
}

async fn seeded_service() -> UserService<InMemoryUserRepository> {
    let service = UserService::new(InMemoryUserRepository::new());
    service
        .create_user(CreateUser {
            email: "dana@shop.test".into(),
            name: "Dana".into(),
            password: "correct horse".into(),
            roles: vec![Role::Manager],
        })
        .await
        .unwrap();
    service
}

fn auth_app(service: UserService<InMemoryUserRepository>) -> Router {
    auth_handlers::router(AuthState {
        service,
        authority: authority(),
        secure_cookies: false,
    })
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_login_returns_tokens_and_cookies() {
    let app = auth_app(seeded_service().await);

    let response = app
        .oneshot(login_request("Dana@Shop.test", "correct horse"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));

    let body: LoginResponse = json_body(response.into_body()).await;
    assert_eq!(body.user.email, "dana@shop.test");
    assert_eq!(body.expires_in, 900);
    assert!(!body.access_token.is_empty());
}

#[tokio::test]
async fn test_login_wrong_password_is_generic_401() {
    let app = auth_app(seeded_service().await);

    let response = app
        .clone()
        .oneshot(login_request("dana@shop.test", "wrong password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let wrong: serde_json::Value = json_body(response.into_body()).await;

    let response = app
        .oneshot(login_request("ghost@shop.test", "correct horse"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let unknown: serde_json::Value = json_body(response.into_body()).await;

    assert_eq!(wrong["message"], unknown["message"]);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = auth_app(seeded_service().await);

    let response = app
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let app = auth_app(seeded_service().await);

    let response = app
        .clone()
        .oneshot(login_request("dana@shop.test", "correct horse"))
        .await
        .unwrap();
    let login: LoginResponse = json_body(response.into_body()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/me")
                .header("authorization", format!("Bearer {}", login.access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let me: User = json_body(response.into_body()).await;
    assert_eq!(me.id, login.user.id);
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let service = seeded_service().await;
    let user = service
        .verify_credentials("dana@shop.test", "correct horse")
        .await
        .unwrap();
    let pair = authority().issue_pair(&user.token_subject()).await.unwrap();

    let response = auth_app(service)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/refresh")
                .header("cookie", format!("refresh_token={}", pair.refresh.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: TokenResponse = json_body(response.into_body()).await;
    assert_ne!(body.access_token, pair.access.token);
}

#[tokio::test]
async fn test_refresh_without_token_is_401() {
    let response = auth_app(seeded_service().await)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let response = auth_app(seeded_service().await)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter(|v| v.to_str().unwrap().contains("Max-Age=0"))
        .count();
    assert_eq!(cleared, 2);
}

#[tokio::test]
async fn test_create_user_duplicate_is_409() {
    let app = handlers::router(seeded_service().await).layer(Extension(admin_claims()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "email": "DANA@shop.test",
                        "name": "Another Dana",
                        "password": "long enough",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_user_validates_email() {
    let app = handlers::router(seeded_service().await).layer(Extension(admin_claims()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "email": "not-an-email", "name": "X", "password": "long enough" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let claims = admin_claims();
    let own_id = claims.sub.clone();
    let app = handlers::router(seeded_service().await).layer(Extension(claims));

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/{}", own_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_filters_by_role() {
    let app = handlers::router(seeded_service().await).layer(Extension(admin_claims()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/?role=manager")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<User> = json_body(response.into_body()).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].roles, vec![Role::Manager]);
}

#[tokio::test]
async fn test_postgres_repository_round_trip() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("users_pg_round_trip");
    let service = UserService::new(PgUserRepository::new(db.connection()));

    let created = service
        .create_user(CreateUser {
            email: builder.email("staff"),
            name: "Staff".into(),
            password: "correct horse".into(),
            roles: vec![Role::Support, Role::Manager],
        })
        .await
        .unwrap();

    let managers = service
        .list_users(UserFilter {
            role: Some(Role::Manager),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(managers.iter().any(|u| u.id == created.id));

    let logged_in = service
        .verify_credentials(&builder.email("staff"), "correct horse")
        .await
        .unwrap();
    assert!(logged_in.last_login_at.is_some());

    let dup = service
        .create_user(CreateUser {
            email: builder.email("staff").to_uppercase(),
            name: "Dup".into(),
            password: "correct horse".into(),
            roles: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(dup, UserError::DuplicateEmail(_)));
}

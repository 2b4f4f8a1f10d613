//! `JwtRedisAuth` against a real Redis: whitelisting, revocation and
//! single-use refresh tokens.

use axum_helpers::{AuthError, JwtConfig, JwtRedisAuth, TokenAuthority, TokenSubject};
use test_utils::TestRedis;
use uuid::Uuid;

fn subject() -> TokenSubject {
    TokenSubject {
        user_id: Uuid::now_v7(),
        email: "agent@shop.test".to_string(),
        name: "Agent".to_string(),
        roles: vec!["support".to_string()],
    }
}

fn authority(redis: &TestRedis) -> JwtRedisAuth {
    let config = JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap();
    JwtRedisAuth::new(redis.connection(), &config)
}

#[tokio::test]
async fn test_revoked_access_token_is_rejected() {
    let redis = TestRedis::new().await;
    let auth = authority(&redis);

    let pair = auth.issue_pair(&subject()).await.unwrap();
    let claims = auth.authenticate(&pair.access.token).await.unwrap();
    assert_eq!(claims.roles, vec!["support"]);

    auth.revoke(&pair.access.token).await.unwrap();
    assert!(matches!(
        auth.authenticate(&pair.access.token).await,
        Err(AuthError::Revoked)
    ));
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let redis = TestRedis::new().await;
    let auth = authority(&redis);

    let pair = auth.issue_pair(&subject()).await.unwrap();
    let renewed = auth.refresh(&pair.refresh.token).await.unwrap();
    assert!(auth.authenticate(&renewed.access.token).await.is_ok());

    assert!(matches!(
        auth.refresh(&pair.refresh.token).await,
        Err(AuthError::Revoked)
    ));
}

#[tokio::test]
async fn test_token_from_another_process_is_not_live() {
    let redis = TestRedis::new().await;
    let auth = authority(&redis);

    // Signed with the same secret but never whitelisted in this Redis
    let config = JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap();
    let stateless = axum_helpers::JwtCodec::new(&config);
    let token = stateless.issue_access_token(&subject()).await.unwrap().token;

    assert!(matches!(
        auth.authenticate(&token).await,
        Err(AuthError::Revoked)
    ));
}

#[tokio::test]
async fn test_revoking_garbage_is_a_no_op() {
    let redis = TestRedis::new().await;
    let auth = authority(&redis);
    assert!(auth.revoke("not-a-jwt").await.is_ok());
}

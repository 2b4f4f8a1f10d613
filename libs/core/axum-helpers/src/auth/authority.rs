use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use thiserror::Error;

use super::{IssuedToken, JwtClaims, JwtCodec, JwtConfig, RedisAuthStore, TokenKind, TokenSubject};
use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Expected a {expected:?} token")]
    WrongKind { expected: TokenKind },

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token store unavailable: {0}")]
    Store(#[from] redis::RedisError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(msg) => AppError::InternalServerError(msg),
            AuthError::Store(e) => {
                tracing::error!(error = %e, "Token store error");
                AppError::ServiceUnavailable("Authentication service unavailable".to_string())
            }
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Access plus refresh token, as handed out by login and refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Issues, validates and revokes tokens.
///
/// The HTTP middleware and the messaging gateway depend on this trait rather
/// than on Redis directly.
#[async_trait]
pub trait TokenAuthority: Send + Sync {
    async fn issue_access_token(&self, subject: &TokenSubject) -> Result<IssuedToken, AuthError>;

    async fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError>;

    /// Validates an access token
    async fn authenticate(&self, token: &str) -> Result<JwtClaims, AuthError>;

    /// Exchanges a refresh token for a new pair; the old refresh token stops working
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Revokes a token of either kind; already invalid tokens are ignored
    async fn revoke(&self, token: &str) -> Result<(), AuthError>;
}

pub type SharedAuthority = Arc<dyn TokenAuthority>;

fn subject_of(claims: &JwtClaims) -> Result<TokenSubject, AuthError> {
    Ok(TokenSubject {
        user_id: claims
            .user_id()
            .ok_or_else(|| AuthError::InvalidToken("subject is not a UUID".to_string()))?,
        email: claims.email.clone(),
        name: claims.name.clone(),
        roles: claims.roles.clone(),
    })
}

fn expect_kind(claims: &JwtClaims, expected: TokenKind) -> Result<(), AuthError> {
    if claims.kind == expected {
        Ok(())
    } else {
        Err(AuthError::WrongKind { expected })
    }
}

/// Stateless: signature and expiry only, revocation is a no-op.
#[async_trait]
impl TokenAuthority for JwtCodec {
    async fn issue_access_token(&self, subject: &TokenSubject) -> Result<IssuedToken, AuthError> {
        self.issue(subject, TokenKind::Access)
    }

    async fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(subject, TokenKind::Access)?,
            refresh: self.issue(subject, TokenKind::Refresh)?,
        })
    }

    async fn authenticate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let claims = self.verify(token)?;
        expect_kind(&claims, TokenKind::Access)?;
        Ok(claims)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.verify(refresh_token)?;
        expect_kind(&claims, TokenKind::Refresh)?;
        self.issue_pair(&subject_of(&claims)?).await
    }

    async fn revoke(&self, _token: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Signed JWTs that are only accepted while their `jti` is whitelisted in
/// Redis and not blacklisted.
#[derive(Clone)]
pub struct JwtRedisAuth {
    codec: JwtCodec,
    store: RedisAuthStore,
}

impl JwtRedisAuth {
    pub fn new(manager: ConnectionManager, config: &JwtConfig) -> Self {
        tracing::info!("JWT + Redis auth initialized");
        Self {
            codec: JwtCodec::new(config),
            store: RedisAuthStore::new(manager),
        }
    }

    async fn issue_whitelisted(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
    ) -> Result<IssuedToken, AuthError> {
        let issued = self.codec.issue(subject, kind)?;
        self.store
            .whitelist(
                &issued.claims.jti,
                &issued.claims.sub,
                self.codec.ttl_for(kind) as u64,
            )
            .await?;
        Ok(issued)
    }

    async fn check_live(&self, claims: &JwtClaims) -> Result<(), AuthError> {
        if self.store.is_blacklisted(&claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Token is blacklisted");
            return Err(AuthError::Revoked);
        }
        if !self.store.is_whitelisted(&claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Token is not whitelisted");
            return Err(AuthError::Revoked);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenAuthority for JwtRedisAuth {
    async fn issue_access_token(&self, subject: &TokenSubject) -> Result<IssuedToken, AuthError> {
        self.issue_whitelisted(subject, TokenKind::Access).await
    }

    async fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue_whitelisted(subject, TokenKind::Access).await?,
            refresh: self.issue_whitelisted(subject, TokenKind::Refresh).await?,
        })
    }

    async fn authenticate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let claims = self.codec.verify(token)?;
        expect_kind(&claims, TokenKind::Access)?;
        self.check_live(&claims).await?;
        Ok(claims)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.verify(refresh_token)?;
        expect_kind(&claims, TokenKind::Refresh)?;

        if self.store.is_blacklisted(&claims.jti).await? || !self.store.consume(&claims.jti).await? {
            return Err(AuthError::Revoked);
        }
        self.store
            .blacklist(&claims.jti, claims.remaining_ttl(Utc::now().timestamp()))
            .await?;

        self.issue_pair(&subject_of(&claims)?).await
    }

    async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(AuthError::Expired | AuthError::InvalidToken(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        self.store
            .blacklist(&claims.jti, claims.remaining_ttl(Utc::now().timestamp()))
            .await?;
        self.store.revoke(&claims.jti).await?;
        tracing::debug!(jti = %claims.jti, kind = ?claims.kind, "Token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn codec() -> JwtCodec {
        JwtCodec::new(&JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap())
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: Uuid::now_v7(),
            email: "manager@shop.test".into(),
            name: "Manager".into(),
            roles: vec!["manager".into()],
        }
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_authenticate() {
        let codec = codec();
        let pair = codec.issue_pair(&subject()).await.unwrap();
        let err = codec.authenticate(&pair.refresh.token).await.unwrap_err();
        assert!(matches!(err, AuthError::WrongKind { expected: TokenKind::Access }));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_pair_for_same_subject() {
        let codec = codec();
        let subject = subject();
        let pair = codec.issue_pair(&subject).await.unwrap();
        let renewed = codec.refresh(&pair.refresh.token).await.unwrap();
        assert_eq!(renewed.access.claims.sub, subject.user_id.to_string());
        assert_ne!(renewed.refresh.claims.jti, pair.refresh.claims.jti);
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let codec = codec();
        let pair = codec.issue_pair(&subject()).await.unwrap();
        assert!(codec.refresh(&pair.access.token).await.is_err());
    }

    #[test]
    fn test_auth_errors_map_to_status() {
        let revoked: AppError = AuthError::Revoked.into();
        assert_eq!(revoked.status(), axum::http::StatusCode::UNAUTHORIZED);

        let signing: AppError = AuthError::Signing("key".into()).into();
        assert_eq!(signing.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}

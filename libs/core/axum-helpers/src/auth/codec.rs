use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::{AuthError, JwtClaims, JwtConfig, TokenKind, TokenSubject};

/// A signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: JwtClaims,
}

/// HS256 signing and verification; no storage involved.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtCodec {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }
    }

    pub fn ttl_for(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }

    pub fn issue(&self, subject: &TokenSubject, kind: TokenKind) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            name: subject.name.clone(),
            roles: subject.roles.clone(),
            exp: (now + Duration::seconds(self.ttl_for(kind))).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Checks signature and expiry
    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtCodec {
        JwtCodec::new(&JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap())
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: Uuid::now_v7(),
            email: "agent@shop.test".into(),
            name: "Agent".into(),
            roles: vec!["support".into()],
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let codec = codec();
        let issued = codec.issue(&subject(), TokenKind::Refresh).unwrap();
        let claims = codec.verify(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 604_800);
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let codec = codec();
        let mut token = codec.issue(&subject(), TokenKind::Access).unwrap().token;
        token.push('x');
        assert!(matches!(codec.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_other_secret_is_invalid() {
        let token = codec().issue(&subject(), TokenKind::Access).unwrap().token;
        let other = JwtCodec::new(&JwtConfig::new("ffffffffffffffffffffffffffffffff").unwrap());
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let mut config = JwtConfig::new("0123456789abcdef0123456789abcdef").unwrap();
        config.access_ttl_secs = -3600;
        let codec = JwtCodec::new(&config);
        let token = codec.issue(&subject(), TokenKind::Access).unwrap().token;
        assert!(matches!(codec.verify(&token), Err(AuthError::Expired)));
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens authenticate requests; refresh tokens only mint new pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    #[default]
    Access,
    Refresh,
}

/// Who a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    /// Token id, the whitelist/blacklist key
    pub jti: String,
    #[serde(default)]
    pub kind: TokenKind,
}

impl JwtClaims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Seconds until expiry, never negative; used as blacklist TTL
    pub fn remaining_ttl(&self, now: i64) -> u64 {
        (self.exp - now).max(1) as u64
    }
}

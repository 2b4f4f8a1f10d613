//! JWT authentication.
//!
//! Tokens are HS256 JWTs ([`JwtCodec`]). In production they are only accepted
//! while their `jti` is whitelisted in Redis and not blacklisted
//! ([`JwtRedisAuth`]). Middleware and the messaging gateway go through the
//! [`TokenAuthority`] trait.
//!
//! ```ignore
//! let config = JwtConfig::from_env()?;
//! let authority: SharedAuthority = Arc::new(JwtRedisAuth::new(redis_manager, &config));
//!
//! let protected = Router::new()
//!     .route("/api/orders", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(authority, jwt_auth_middleware));
//! ```

pub mod authority;
pub mod claims;
pub mod codec;
pub mod config;
pub mod cookies;
pub mod middleware;
pub mod store;

/// 15 minutes
pub const ACCESS_TOKEN_TTL: i64 = 900;
/// 7 days
pub const REFRESH_TOKEN_TTL: i64 = 604_800;

pub use authority::{AuthError, JwtRedisAuth, SharedAuthority, TokenAuthority, TokenPair};
pub use claims::{JwtClaims, TokenKind, TokenSubject};
pub use codec::{IssuedToken, JwtCodec};
pub use config::JwtConfig;
pub use cookies::{ACCESS_COOKIE, REFRESH_COOKIE, auth_cookie, clear_cookie};
pub use middleware::{
    RequireRoles, cookie_value, extract_token_from_request, jwt_auth_middleware, require_roles,
};
pub use store::RedisAuthStore;

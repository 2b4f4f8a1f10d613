//! # Axum Helpers
//!
//! Shared HTTP plumbing for the console API.
//!
//! - **[`auth`]**: JWT issuing/validation with a Redis whitelist, auth and role middleware
//! - **[`server`]**: router assembly with OpenAPI UIs, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: [`AppError`] and the `{code, error, message, details}` body
//! - **[`extractors`]**: [`UuidPath`], [`ValidatedJson`], [`ValidatedQuery`]
//! - **[`audit`]**: audit events on the `audit` tracing target
//! - **[`observability`]**: Prometheus recorder, `/metrics`, request counters
//! - **[`csv_io`]**: import reports, column aliasing, money cells, CSV downloads

pub mod audit;
pub mod auth;
pub mod csv_io;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod observability;
pub mod server;

pub use auth::{
    ACCESS_TOKEN_TTL, AuthError, JwtClaims, JwtCodec, JwtConfig, JwtRedisAuth, REFRESH_TOKEN_TTL,
    RedisAuthStore, RequireRoles, SharedAuthority, TokenAuthority, TokenKind, TokenPair,
    TokenSubject, jwt_auth_middleware, require_roles,
};

pub use server::{
    CleanupCoordinator, HealthCheckFuture, HealthResponse, ShutdownCoordinator, close_postgres,
    create_production_app, create_router, health_router, run_health_checks,
    shutdown_signal,
};

pub use http::{cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{UuidPath, ValidatedJson, ValidatedQuery};

pub use csv_io::{CsvAttachment, ImportMode, ImportParams, ImportReport, RowError};

pub use audit::{AuditEvent, AuditOutcome, extract_ip_from_headers, extract_user_agent};

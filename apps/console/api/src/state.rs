//! Shared application state, built once in `main` and borrowed by the
//! route builders.

use axum_helpers::{SharedAuthority, ShutdownCoordinator};

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub db: database::postgres::DatabaseConnection,
    pub redis: database::redis::ConnectionManager,
    /// Redis-backed JWT issuing and validation
    pub authority: SharedAuthority,
    /// Fired on SIGINT/SIGTERM; open sockets close on it
    pub shutdown: ShutdownCoordinator,
}

//! Users Domain
//!
//! Staff accounts of the storefront console and the login flow.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← /users CRUD (admin only), /auth login/logout/refresh/me
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Email normalisation, argon2id hashing, credential checks
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + in-memory and Postgres implementations)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← User, Role, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{handlers, InMemoryUserRepository, UserService};
//!
//! let service = UserService::new(InMemoryUserRepository::new());
//! let router = handlers::router(service);
//! ```

pub mod auth_handlers;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use auth_handlers::AuthState;
pub use error::{UserError, UserResult};
pub use models::{
    CreateUser, LoginRequest, LoginResponse, Role, TokenResponse, UpdateUser, User, UserFilter,
};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;

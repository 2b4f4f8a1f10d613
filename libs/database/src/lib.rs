//! Storage plumbing shared by the console domains.
//!
//! # Features
//!
//! - `postgres` (default): SeaORM connection pool, migrations runner, health
//!   check and the generic [`BaseRepository`]
//! - `redis` (default): connection manager used for token whitelists
//! - `config`: `core_config::FromEnv` impls for the connection settings
//!
//! [`text`] (slugs, `LIKE` escaping) is always available.
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_from_config_with_retry(PostgresConfig::from_env()?, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "console_api").await?;
//! ```

pub mod common;
pub mod text;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub mod repository;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};

#[cfg(feature = "postgres")]
pub use repository::{BaseRepository, UuidEntity};

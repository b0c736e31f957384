//! Connection management for PostgreSQL (SeaORM) and Redis.
//!
//! # Features
//!
//! - `postgres` (default): SeaORM pool, migrations, health check
//! - `redis` (default): `ConnectionManager`, health check
//! - `config`: `core_config::FromEnv` for the config structs
//! - `all`: everything
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_from_config_with_retry(PostgresConfig::from_env()?, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "rating_api").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult};

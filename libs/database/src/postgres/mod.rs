//! PostgreSQL pool setup, migrations and health check.

mod config;
mod connector;

pub use config::PostgresConfig;
pub use connector::{
    check_health, connect_from_config, connect_from_config_with_retry, run_migrations,
};

pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
pub use sea_orm_migration::MigratorTrait;

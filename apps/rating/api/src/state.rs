//! Shared application state.
//!
//! Cloned into every router that needs it; all members are cheap handles.

use axum_helpers::JwtAuth;
use database::postgres::DatabaseConnection;
use database::redis::ConnectionManager;

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: DatabaseConnection,
    /// Present only when `REDIS_URL` is configured
    pub redis: Option<ConnectionManager>,
    pub jwt_auth: JwtAuth,
}

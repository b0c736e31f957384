//! # Axum Helpers
//!
//! Shared building blocks for the HTTP services in this workspace.
//!
//! - **[`auth`]**: JWT issuing, verification and middleware
//! - **[`server`]**: Router setup, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: Structured error responses with error codes
//! - **[`extractors`]**: UUID path and validated JSON extractors

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{
    IssuedToken, JwtAuth, JwtClaims, JwtConfig, JwtError, jwt_auth_middleware,
    optional_jwt_auth_middleware,
};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};

pub use http::{CorsConfig, create_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{UuidPath, ValidatedJson};

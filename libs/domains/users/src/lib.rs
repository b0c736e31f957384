//! Users Domain
//!
//! User accounts, credentials and token issuance.
//!
//! # Features
//!
//! - Registration with argon2 password hashing
//! - Paged listing and counting of active users
//! - Self-service and admin updates, admin-only soft delete
//! - Login issuing HS256 access tokens
//! - Optional Redis read-through cache for lookups
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐      ┌─────────┐
//! │   Service   │ ───▶ │  Cache  │  ← Redis or no-op
//! └──────┬──────┘      └─────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + implementations)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs, enums
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use domain_users::{handlers, InMemoryUserRepository, UserService};
//!
//! let auth = JwtAuth::new(&JwtConfig::new("a-secret-that-is-at-least-32-chars!!").unwrap());
//! let service = UserService::new(InMemoryUserRepository::new(), auth.clone());
//!
//! let users = handlers::router(service.clone(), auth);
//! let login = handlers::auth_router(service);
//! ```

pub mod cache;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use cache::{NoopUserCache, RedisUserCache, UserCache};
pub use error::{UserError, UserResult};
pub use handlers::{ApiDoc, AuthApiDoc};
pub use models::{
    Actor, CountResponse, CreateUser, CreatedResponse, DeleteResponse, ListQuery, LoginRequest,
    LoginResponse, Role, UpdateUser, User, UserListResponse,
};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;

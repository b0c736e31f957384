//! Stateless JWT authentication.
//!
//! - [`JwtConfig`]: signing secret and token lifetime, loaded from the environment
//! - [`JwtAuth`]: HS256 token issuing and verification
//! - [`jwt_auth_middleware`]: rejects requests without a valid token and
//!   stores the [`JwtClaims`] in request extensions
//!
//! ```ignore
//! let auth = JwtAuth::new(&JwtConfig::from_env()?);
//!
//! let protected = Router::new()
//!     .route("/users/{id}/like", post(like))
//!     .layer(axum::middleware::from_fn_with_state(auth, jwt_auth_middleware));
//! ```

pub mod config;
pub mod jwt;
pub mod middleware;

pub use config::JwtConfig;
pub use jwt::{JwtAuth, JwtClaims, JwtError, IssuedToken};
pub use middleware::{jwt_auth_middleware, optional_jwt_auth_middleware};

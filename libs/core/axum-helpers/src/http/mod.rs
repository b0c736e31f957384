//! Cross-cutting HTTP middleware: CORS and security headers.

pub mod cors;
pub mod security;

pub use cors::{CorsConfig, create_cors_layer};
pub use security::security_headers;

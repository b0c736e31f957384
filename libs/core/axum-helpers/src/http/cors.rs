use axum::http::{HeaderName, HeaderValue, Method, header};
use core_config::{ConfigError, FromEnv, env_or_default};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Allowed browser origins.
///
/// `CORS_ALLOWED_ORIGIN` holds a comma-separated list, e.g.
/// `http://localhost:3000,https://app.example.com`.
#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub allowed_origins: Vec<HeaderValue>,
}

impl CorsConfig {
    pub fn parse(origins: &str) -> Result<Self, ConfigError> {
        let allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| ConfigError::ParseError {
                        key: "CORS_ALLOWED_ORIGIN".to_string(),
                        details: format!("{s}: {e}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if allowed_origins.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "CORS_ALLOWED_ORIGIN".to_string(),
                details: "cannot be empty".to_string(),
            });
        }

        Ok(Self { allowed_origins })
    }
}

impl FromEnv for CorsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::parse(&env_or_default(
            "CORS_ALLOWED_ORIGIN",
            "http://localhost:3000",
        ))
    }
}

/// CORS layer for the API: common methods, auth headers, credentials, 1h max age.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::COOKIE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([header::RETRY_AFTER])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

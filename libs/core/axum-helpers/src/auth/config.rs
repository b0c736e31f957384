//! JWT settings, loaded through `core_config::FromEnv`.

use core_config::{ConfigError, FromEnv, env_parse, env_required};

/// Minimum secret length accepted for HS256 signing.
pub const MIN_SECRET_LEN: usize = 32;

/// JWT authentication configuration.
///
/// - `JWT_SECRET` (required, at least 32 characters)
/// - `JWT_EXPIRATION_SECS` (optional, default 86400)
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_secs: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        check_secret(&secret)?;
        Ok(Self {
            secret,
            expiration_secs: 86_400,
        })
    }

    pub fn with_expiration(mut self, secs: i64) -> Self {
        self.expiration_secs = secs;
        self
    }
}

fn check_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::InvalidValue {
            key: "JWT_SECRET".to_string(),
            details: format!(
                "must be at least {MIN_SECRET_LEN} characters (got {}). Generate one with: openssl rand -base64 32",
                secret.len()
            ),
        });
    }
    Ok(())
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = env_required("JWT_SECRET")?;
        check_secret(&secret)?;

        let expiration_secs: i64 = env_parse("JWT_EXPIRATION_SECS", "86400")?;
        if expiration_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRATION_SECS".to_string(),
                details: "must be positive".to_string(),
            });
        }

        Ok(Self {
            secret,
            expiration_secs,
        })
    }
}

#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv};

/// Redis connection settings.
///
/// The cache is optional: callers use [`RedisConfig::from_env_optional`] and
/// run without a cache when `REDIS_URL` is unset.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

#[cfg(feature = "config")]
impl RedisConfig {
    /// `Ok(None)` when `REDIS_URL` is unset or empty.
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        match std::env::var("REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(Some(Self::from_url(url)?)),
            _ => Ok(None),
        }
    }

    fn from_url(url: String) -> Result<Self, ConfigError> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(ConfigError::InvalidValue {
                key: "REDIS_URL".to_string(),
                details: format!("expected a redis:// or rediss:// URL, got '{}'", url),
            });
        }
        Ok(Self { url })
    }
}

#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = core_config::env_required("REDIS_URL")?;
        Self::from_url(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_default() {
        assert_eq!(RedisConfig::default().url, "redis://127.0.0.1:6379");
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env() {
        temp_env::with_var("REDIS_URL", Some("redis://cache:6379"), || {
            let config = RedisConfig::from_env().unwrap();
            assert_eq!(config.url, "redis://cache:6379");
        });
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_rejects_other_schemes() {
        temp_env::with_var("REDIS_URL", Some("http://cache:6379"), || {
            let err = RedisConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("REDIS_URL"));
        });
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_optional_unset() {
        temp_env::with_var_unset("REDIS_URL", || {
            assert!(RedisConfig::from_env_optional().unwrap().is_none());
        });
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_optional_empty() {
        temp_env::with_var("REDIS_URL", Some("  "), || {
            assert!(RedisConfig::from_env_optional().unwrap().is_none());
        });
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_optional_set() {
        temp_env::with_var("REDIS_URL", Some("rediss://cache:6380"), || {
            let config = RedisConfig::from_env_optional().unwrap().unwrap();
            assert_eq!(config.url, "rediss://cache:6380");
        });
    }
}

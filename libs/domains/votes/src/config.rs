use core_config::{ConfigError, FromEnv, env_parse};
use std::time::Duration;

/// Vote policy settings.
#[derive(Debug, Clone)]
pub struct VoteConfig {
    /// Minimum time between two casts for the same (voter, target)
    pub cooldown: Duration,
    /// Maximum wait for a concurrent operation on the same pair
    pub lock_timeout: Duration,
}

impl VoteConfig {
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(3600),
            lock_timeout: Duration::from_millis(5000),
        }
    }
}

/// - `VOTE_COOLDOWN_SECS` (default 3600, 0 disables the cooldown)
/// - `VOTE_LOCK_TIMEOUT_MS` (default 5000, must be positive)
impl FromEnv for VoteConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let cooldown_secs: u64 = env_parse("VOTE_COOLDOWN_SECS", "3600")?;
        let lock_timeout_ms: u64 = env_parse("VOTE_LOCK_TIMEOUT_MS", "5000")?;

        if lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "VOTE_LOCK_TIMEOUT_MS".to_string(),
                details: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            cooldown: Duration::from_secs(cooldown_secs),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(["VOTE_COOLDOWN_SECS", "VOTE_LOCK_TIMEOUT_MS"], || {
            let config = VoteConfig::from_env().unwrap();
            assert_eq!(config.cooldown, Duration::from_secs(3600));
            assert_eq!(config.lock_timeout, Duration::from_millis(5000));
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("VOTE_COOLDOWN_SECS", Some("60")),
                ("VOTE_LOCK_TIMEOUT_MS", Some("250")),
            ],
            || {
                let config = VoteConfig::from_env().unwrap();
                assert_eq!(config.cooldown, Duration::from_secs(60));
                assert_eq!(config.lock_timeout, Duration::from_millis(250));
            },
        );
    }

    #[test]
    fn test_zero_cooldown_allowed() {
        temp_env::with_var("VOTE_COOLDOWN_SECS", Some("0"), || {
            let config = VoteConfig::from_env().unwrap();
            assert!(config.cooldown.is_zero());
        });
    }

    #[test]
    fn test_zero_lock_timeout_rejected() {
        temp_env::with_var("VOTE_LOCK_TIMEOUT_MS", Some("0"), || {
            let err = VoteConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("VOTE_LOCK_TIMEOUT_MS"));
        });
    }

    #[test]
    fn test_invalid_number() {
        temp_env::with_var("VOTE_COOLDOWN_SECS", Some("an hour"), || {
            assert!(VoteConfig::from_env().is_err());
        });
    }
}

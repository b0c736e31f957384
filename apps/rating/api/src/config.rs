use axum_helpers::{CorsConfig, JwtConfig};
use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_votes::VoteConfig;

pub use core_config::Environment;

/// Application configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    /// `None` runs the service without the user cache
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub votes: VoteConfig,
    pub cors: CorsConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // DATABASE_URL is required
        let server = ServerConfig::from_env()?;
        let redis = RedisConfig::from_env_optional()?;
        let jwt = JwtConfig::from_env()?; // JWT_SECRET is required
        let votes = VoteConfig::from_env()?;
        let cors = CorsConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            database,
            redis,
            jwt,
            votes,
            cors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "config-test-secret-with-at-least-32-chars";

    #[test]
    fn test_from_env_minimal() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/rating")),
                ("JWT_SECRET", Some(SECRET)),
                ("REDIS_URL", None),
                ("APP_ENV", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.app.name, "rating_api");
                assert_eq!(config.environment, Environment::Development);
                assert!(config.redis.is_none());
                assert_eq!(config.votes.cooldown.as_secs(), 3600);
            },
        );
    }

    #[test]
    fn test_from_env_with_redis() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/rating")),
                ("JWT_SECRET", Some(SECRET)),
                ("REDIS_URL", Some("redis://cache:6379")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.redis.unwrap().url, "redis://cache:6379");
            },
        );
    }

    #[test]
    fn test_from_env_requires_jwt_secret() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/rating")),
                ("JWT_SECRET", None),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("JWT_SECRET"));
            },
        );
    }
}

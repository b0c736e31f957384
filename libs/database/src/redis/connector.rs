use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::RedisConfig;
use crate::common::{DatabaseError, RetryConfig, retry, retry_with_backoff};

/// Open a [`ConnectionManager`] and verify it with `PING`.
///
/// The manager reconnects on its own after transient failures.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

pub async fn connect_from_config_with_retry(
    config: RedisConfig,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    let url = config.url;

    match retry_config {
        Some(retry_config) => retry_with_backoff(|| connect(&url), retry_config).await,
        None => retry(|| connect(&url)).await,
    }
}

pub async fn check_health(conn: &mut ConnectionManager) -> Result<(), DatabaseError> {
    let pong: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("Redis: {}", e)))?;

    if pong != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "Redis: unexpected PING reply '{}'",
            pong
        )));
    }

    debug!("Redis health check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        assert!(connect("not a url").await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_connect_and_ping() {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let mut conn = connect(&url).await.unwrap();
        check_health(&mut conn).await.unwrap();
    }
}

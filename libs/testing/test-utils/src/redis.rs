//! Redis container for cache tests.

use redis::Client;
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// A running Redis container plus a managed connection to it.
///
/// The container lives as long as this value.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    connection: ConnectionManager,
    url: String,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");
        let url = format!("redis://127.0.0.1:{}", port);

        let client = Client::open(url.as_str()).expect("Failed to create Redis client");
        let connection = ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis");

        tracing::info!(port, "Test Redis ready");

        Self {
            _container: container,
            connection,
            url,
        }
    }

    /// Same handle type `RedisUserCache` is built from
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    pub fn connection_string(&self) -> &str {
        &self.url
    }
}

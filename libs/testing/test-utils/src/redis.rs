use redis::Client;
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// Throwaway Redis (`redis:8-alpine`) for the token store tests.
/// The container is removed on drop.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    connection: ConnectionManager,
    pub url: String,
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

        let url = format!("redis://127.0.0.1:{port}");
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

    /// Cheap clone of the managed connection
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

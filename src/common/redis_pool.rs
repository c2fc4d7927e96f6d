use deadpool::managed::{Manager, Metrics, Pool, RecycleError, RecycleResult};
use redis::{AsyncConnectionConfig, RedisError, RedisResult};
use tracing::debug;

/// deadpool manager handing out multiplexed redis connections.
pub struct RedisPoolManager {
    client: redis::Client,
    config: AsyncConnectionConfig,
}

impl RedisPoolManager {
    pub fn new(client: redis::Client, config: AsyncConnectionConfig) -> Self {
        Self { client, config }
    }
}

impl Manager for RedisPoolManager {
    type Type = redis::aio::MultiplexedConnection;
    type Error = RedisError;

    async fn create(&self) -> RedisResult<Self::Type> {
        self.client
            .get_multiplexed_async_connection_with_config(&self.config)
            .await
    }

    async fn recycle(&self, conn: &mut Self::Type, metrics: &Metrics) -> RecycleResult<Self::Error> {
        match redis::cmd("PING").query_async::<()>(conn).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(
                    recycle_count = metrics.recycle_count,
                    "Dropping broken redis connection: {e}"
                );
                Err(RecycleError::Backend(e))
            }
        }
    }
}

pub type RedisPool = Pool<RedisPoolManager>;

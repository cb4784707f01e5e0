//! Redis list length source.
//!
//! Measures a queue with `LLEN` on database 0. Connections are
//! `MultiplexedConnection`s shared through a [`ConnectionPool`], so
//! every scaler pointing at the same Redis with the same password reuses
//! one socket.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::pool::{ConnectionPool, PoolConfig, PoolKey};
use crate::{QueueLengthSource, QueueTarget};

/// Port assumed when an address carries none.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// [`QueueLengthSource`] backed by Redis lists.
pub struct RedisListSource {
    pool: ConnectionPool<MultiplexedConnection>,
}

impl RedisListSource {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pool: ConnectionPool::new(config),
        }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &ConnectionPool<MultiplexedConnection> {
        &self.pool
    }

    /// Reap idle connections on the configured interval until shutdown.
    pub async fn run_reaper(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.pool.config().reap_interval;
        info!(interval_secs = interval.as_secs(), "connection reaper started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.pool.reap_idle().await;
                }
                _ = shutdown.changed() => {
                    info!("connection reaper shutting down");
                    break;
                }
            }
        }
    }

    async fn connection(&self, target: &QueueTarget) -> StoreResult<MultiplexedConnection> {
        let key = target.pool_key();
        if let Some(conn) = self.pool.get(&key).await {
            return Ok(conn);
        }

        let info = connection_info(&target.address, &target.password)?;
        let client = redis::Client::open(info).map_err(|source| StoreError::Connect {
            address: target.address.clone(),
            source,
        })?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|source| StoreError::Connect {
                address: target.address.clone(),
                source,
            })?;

        debug!(address = %target.address, "opened store connection");
        Ok(self.pool.insert(key, conn).await)
    }
}

impl Default for RedisListSource {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

#[async_trait]
impl QueueLengthSource for RedisListSource {
    async fn queue_length(&self, target: &QueueTarget) -> StoreResult<i64> {
        let mut conn = self.connection(target).await?;

        let result: redis::RedisResult<i64> = conn.llen(target.queue.as_str()).await;
        match result {
            Ok(len) => {
                debug!(address = %target.address, queue = %target.queue, len, "measured queue");
                Ok(len)
            }
            Err(source) => {
                let err = StoreError::Command {
                    queue: target.queue.clone(),
                    source,
                };
                if err.poisons_connection() {
                    warn!(address = %target.address, error = %err, "dropping broken store connection");
                    self.pool.evict(&target.pool_key()).await;
                }
                Err(err)
            }
        }
    }

    async fn release(&self, key: &PoolKey) {
        self.pool.evict(key).await;
    }
}

/// Build Redis connection info for `host:port` and an optional password.
pub fn connection_info(address: &str, password: &str) -> StoreResult<ConnectionInfo> {
    let (host, port) = split_address(address)?;
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo {
            db: 0,
            password: (!password.is_empty()).then(|| password.to_string()),
            ..Default::default()
        },
    })
}

fn split_address(address: &str) -> StoreResult<(String, u16)> {
    let invalid = || StoreError::InvalidAddress(address.to_string());

    let (host, port) = match address.rsplit_once(':') {
        // A bare IPv6 address has colons but no brackets and no port.
        Some((host, _)) if host.contains(':') && !host.starts_with('[') => {
            (address, DEFAULT_REDIS_PORT)
        }
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
        None => (address, DEFAULT_REDIS_PORT),
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

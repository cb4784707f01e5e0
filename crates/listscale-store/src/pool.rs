//! Connection pool keyed by `(address, password)`.
//!
//! One live connection per key. Connections are created lazily by the
//! caller, shared by cloning (multiplexed connections are cheap handles),
//! and reaped once they sit unused for longer than `idle_timeout`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Key identifying a pooled connection. Scalers with the same key share it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub address: String,
    pub password: String,
}

impl PoolKey {
    pub fn new(address: &str, password: &str) -> Self {
        Self {
            address: address.to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolKey")
            .field("address", &self.address)
            .field("password", &redact(&self.password))
            .finish()
    }
}

pub(crate) fn redact(password: &str) -> &'static str {
    if password.is_empty() { "" } else { "<redacted>" }
}

/// Configuration for the connection pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Connections unused for longer than this are dropped (default: 300s).
    pub idle_timeout: Duration,
    /// How often the reaper runs (default: 60s).
    pub reap_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            reap_interval: Duration::from_secs(60),
        }
    }
}

struct PoolEntry<C> {
    conn: C,
    last_used: Instant,
}

/// Pool of shared connections, one per [`PoolKey`].
pub struct ConnectionPool<C> {
    entries: Mutex<HashMap<PoolKey, PoolEntry<C>>>,
    config: PoolConfig,
}

impl<C: Clone> ConnectionPool<C> {
    /// Create an empty pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Check out the connection for `key`, if one is pooled.
    pub async fn get(&self, key: &PoolKey) -> Option<C> {
        let mut entries = self.entries.lock().await;
        entries.get_mut(key).map(|entry| {
            entry.last_used = Instant::now();
            entry.conn.clone()
        })
    }

    /// Pool a freshly opened connection.
    ///
    /// If another caller pooled a connection for the same key in the
    /// meantime, that one wins and is returned; `conn` is dropped.
    pub async fn insert(&self, key: PoolKey, conn: C) -> C {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(key).or_insert_with(|| PoolEntry {
            conn,
            last_used: Instant::now(),
        });
        entry.last_used = Instant::now();
        entry.conn.clone()
    }

    /// Drop the connection for `key`. Returns whether one was pooled.
    pub async fn evict(&self, key: &PoolKey) -> bool {
        let removed = self.entries.lock().await.remove(key).is_some();
        if removed {
            tracing::debug!(address = %key.address, "evicted pooled connection");
        }
        removed
    }

    /// Drop connections idle longer than the configured timeout.
    ///
    /// Returns the number of connections reaped.
    pub async fn reap_idle(&self) -> usize {
        let idle_timeout = self.config.idle_timeout;
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, entry| {
            let keep = entry.last_used.elapsed() < idle_timeout;
            if !keep {
                tracing::debug!(address = %key.address, "reaping idle connection");
            }
            keep
        });
        let reaped = before - entries.len();
        if reaped > 0 {
            tracing::info!(reaped, remaining = entries.len(), "reaped idle connections");
        }
        reaped
    }

    /// Number of pooled connections.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(address: &str) -> PoolKey {
        PoolKey::new(address, "")
    }

    #[tokio::test]
    async fn get_on_empty_pool_is_none() {
        let pool: ConnectionPool<u32> = ConnectionPool::new(PoolConfig::default());
        assert!(pool.get(&key("a:6379")).await.is_none());
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn insert_then_get_returns_same_connection() {
        let pool = ConnectionPool::new(PoolConfig::default());
        assert_eq!(pool.insert(key("a:6379"), 7u32).await, 7);
        assert_eq!(pool.get(&key("a:6379")).await, Some(7));
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn racing_insert_keeps_first_connection() {
        let pool = ConnectionPool::new(PoolConfig::default());
        pool.insert(key("a:6379"), 1u32).await;
        let winner = pool.insert(key("a:6379"), 2u32).await;
        assert_eq!(winner, 1);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn evict_removes_only_that_key() {
        let pool = ConnectionPool::new(PoolConfig::default());
        pool.insert(key("a:6379"), 1u32).await;
        pool.insert(key("b:6379"), 2u32).await;

        assert!(pool.evict(&key("a:6379")).await);
        assert!(!pool.evict(&key("a:6379")).await);
        assert_eq!(pool.get(&key("b:6379")).await, Some(2));
    }

    #[tokio::test]
    async fn reap_idle_removes_old_connections() {
        let pool = ConnectionPool::new(PoolConfig {
            idle_timeout: Duration::from_millis(1),
            ..PoolConfig::default()
        });
        pool.insert(key("a:6379"), 1u32).await;

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(pool.reap_idle().await, 1);
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn reap_idle_keeps_recent_connections() {
        let pool = ConnectionPool::new(PoolConfig::default());
        pool.insert(key("a:6379"), 1u32).await;

        assert_eq!(pool.reap_idle().await, 0);
        assert_eq!(pool.len().await, 1);
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", PoolKey::new("a:6379", "secret"));
        assert!(!rendered.contains("secret"));
    }
}

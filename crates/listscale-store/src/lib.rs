//! listscale-store — queue length queries against the external store.
//!
//! The scaler only ever asks the store one question: how long is this
//! list right now? [`QueueLengthSource`] is that question as a trait, and
//! [`RedisListSource`] answers it with `LLEN` over connections pooled per
//! `(address, password)` pair.
//!
//! # Architecture
//!
//! ```text
//! queue_length(target)
//!   → ConnectionPool looks up PoolKey(address, password)
//!     → pooled connection present → LLEN on it
//!     → no connection → connect, insert into pool → LLEN
//!   → connection-level failure → evict the pooled connection, return error
//! ```
//!
//! Every call is a single attempt. Retry policy belongs to whoever is
//! polling.

pub mod error;
pub mod pool;
pub mod list;

use async_trait::async_trait;

pub use error::{StoreError, StoreResult};
pub use pool::{ConnectionPool, PoolConfig, PoolKey};
pub use list::RedisListSource;

/// Everything needed to measure one queue.
#[derive(Clone, PartialEq, Eq)]
pub struct QueueTarget {
    /// Store address as `host:port`.
    pub address: String,
    /// Store password; empty means no AUTH.
    pub password: String,
    /// Name of the list whose length is the load signal.
    pub queue: String,
}

impl QueueTarget {
    pub fn new(address: &str, password: &str, queue: &str) -> Self {
        Self {
            address: address.to_string(),
            password: password.to_string(),
            queue: queue.to_string(),
        }
    }

    /// The pool key connections for this target are shared under.
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(&self.address, &self.password)
    }
}

impl std::fmt::Debug for QueueTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueTarget")
            .field("address", &self.address)
            .field("password", &pool::redact(&self.password))
            .field("queue", &self.queue)
            .finish()
    }
}

/// A source of queue lengths.
///
/// Implementations must not retry internally; a failed attempt is
/// reported as-is.
#[async_trait]
pub trait QueueLengthSource: Send + Sync + 'static {
    /// Current length of the target queue.
    async fn queue_length(&self, target: &QueueTarget) -> StoreResult<i64>;

    /// Drop any cached connection held for `key`.
    ///
    /// Called when no registered scaler references the key any more.
    /// Sources without connection state can rely on the default no-op.
    async fn release(&self, _key: &PoolKey) {}
}

//! List scaler — the external scaler's operations.
//!
//! Validates registration metadata, keeps the registry, and turns queue
//! lengths into the activity flag and metric shapes the controller asks
//! for. Transport-agnostic: the gRPC server in `listscale-grpc` only
//! translates messages and errors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use listscale_store::{PoolKey, QueueLengthSource, StoreError};
use tracing::{debug, info, warn};

use crate::entry::{METRIC_NAME, ScalerDefaults, ScalerEntry};
use crate::error::{ScalerError, ScalerResult};
use crate::identity::WorkloadId;
use crate::registry::ScalerRegistry;

/// Upper bound on a single queue length query when the caller sets no deadline.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Metric descriptor: the controller divides the metric value by `target_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub metric_name: String,
    pub target_size: i64,
}

/// Current value of a published metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricValue {
    pub metric_name: String,
    pub metric_value: i64,
}

/// Scaler keyed by workload, measuring Redis list lengths.
pub struct ListScaler<S> {
    registry: ScalerRegistry,
    source: Arc<S>,
    defaults: ScalerDefaults,
    query_timeout: Duration,
}

impl<S: QueueLengthSource> ListScaler<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            registry: ScalerRegistry::new(),
            source,
            defaults: ScalerDefaults::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the fallbacks used for missing metadata keys.
    pub fn with_defaults(mut self, defaults: ScalerDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the query timeout applied when the caller's deadline is later or absent.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ScalerRegistry {
        &self.registry
    }

    /// Register (or re-register) a workload from its metadata.
    ///
    /// Invalid metadata leaves the registry untouched.
    pub async fn register(
        &self,
        id: WorkloadId,
        metadata: &HashMap<String, String>,
    ) -> ScalerResult<()> {
        info!(workload = %id, "register called");

        let entry = ScalerEntry::from_metadata(metadata, &self.defaults).inspect_err(|e| {
            warn!(workload = %id, error = %e, "rejected scaler metadata");
        })?;
        let new_key = entry.pool_key();

        if let Some(previous) = self.registry.put(id.clone(), entry) {
            let old_key = previous.pool_key();
            if old_key != new_key {
                self.release_if_unreferenced(&old_key).await;
            }
        }

        info!(workload = %id, "register completed");
        Ok(())
    }

    /// Forget a workload. Unknown workloads are ignored.
    pub async fn deregister(&self, id: &WorkloadId) {
        info!(workload = %id, "deregister called");

        if let Some(removed) = self.registry.remove(id) {
            self.release_if_unreferenced(&removed.pool_key()).await;
        }

        info!(workload = %id, "deregister completed");
    }

    /// Whether the workload's queue has anything in it.
    pub async fn is_active(&self, id: &WorkloadId, deadline: Option<Duration>) -> ScalerResult<bool> {
        info!(workload = %id, "is_active called");

        let len = self.measure(id, deadline).await?;

        info!(workload = %id, len, "is_active completed");
        Ok(len > 0)
    }

    /// The single metric this scaler publishes for the workload.
    pub fn metric_spec(&self, id: &WorkloadId) -> ScalerResult<MetricSpec> {
        info!(workload = %id, "metric_spec called");

        let entry = self.lookup(id)?;
        let spec = MetricSpec {
            metric_name: METRIC_NAME.to_string(),
            target_size: entry.list_length,
        };

        info!(workload = %id, target_size = spec.target_size, "metric_spec completed");
        Ok(spec)
    }

    /// Current value of the published metric.
    ///
    /// The requested `metric_name` is not checked: controllers may send it
    /// empty or prefixed, and there is only one metric to report.
    pub async fn metric_value(
        &self,
        id: &WorkloadId,
        metric_name: &str,
        deadline: Option<Duration>,
    ) -> ScalerResult<MetricValue> {
        info!(workload = %id, "metric_value called");

        if !metric_name.is_empty() && metric_name != METRIC_NAME {
            debug!(workload = %id, requested = metric_name, "requested metric name differs, reporting list length");
        }

        let len = self.measure(id, deadline).await?;

        info!(workload = %id, len, "metric_value completed");
        Ok(MetricValue {
            metric_name: METRIC_NAME.to_string(),
            metric_value: len,
        })
    }

    fn lookup(&self, id: &WorkloadId) -> ScalerResult<ScalerEntry> {
        self.registry
            .get(id)
            .ok_or_else(|| ScalerError::NotRegistered(id.to_string()))
    }

    async fn measure(&self, id: &WorkloadId, deadline: Option<Duration>) -> ScalerResult<i64> {
        // Copied out: the registry lock is released before the query starts.
        let target = self.lookup(id)?.target();

        let budget = deadline.map_or(self.query_timeout, |d| d.min(self.query_timeout));
        let result = match tokio::time::timeout(budget, self.source.queue_length(&target)).await {
            Ok(result) => result,
            Err(_) => {
                // A connection that stopped answering would otherwise stay pooled.
                self.source.release(&target.pool_key()).await;
                Err(StoreError::Timeout(budget))
            }
        };

        result.map_err(|e| {
            warn!(workload = %id, queue = %target.queue, error = %e, "queue length query failed");
            ScalerError::StoreQuery(e)
        })
    }

    async fn release_if_unreferenced(&self, key: &PoolKey) {
        if !self.registry.references_pool(key) {
            debug!(address = %key.address, "no scaler uses store connection any more");
            self.source.release(key).await;
        }
    }
}

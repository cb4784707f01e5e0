//! listscale-core — the external scaler's state and operations.
//!
//! Tracks one scaler entry per workload and answers the controller's
//! questions about it by measuring a Redis list.
//!
//! # Architecture
//!
//! ```text
//! ListScaler
//!   ├── register(id, metadata)   → ScalerEntry::from_metadata → registry.put
//!   ├── deregister(id)           → registry.remove
//!   ├── is_active(id)            → registry.get → queue_length > 0
//!   ├── metric_spec(id)          → registry.get → (METRIC_NAME, listLength)
//!   └── metric_value(id)         → registry.get → (METRIC_NAME, queue_length)
//!
//! ScalerRegistry: RwLock<HashMap<WorkloadId, ScalerEntry>>
//! ```
//!
//! Entries live for the lifetime of the process. The controller
//! re-registers its workloads after a restart.

pub mod entry;
pub mod error;
pub mod identity;
pub mod registry;
pub mod scaler;

pub use entry::{METRIC_NAME, ScalerDefaults, ScalerEntry};
pub use error::{ScalerError, ScalerResult};
pub use identity::WorkloadId;
pub use registry::ScalerRegistry;
pub use scaler::{ListScaler, MetricSpec, MetricValue};

//! Scaler entries and the registration metadata parser.
//!
//! The controller registers a workload with a flat string map. Recognised
//! keys:
//!
//! | key          | meaning                 | when absent            |
//! |--------------|-------------------------|------------------------|
//! | `listLength` | target load threshold   | `defaults.list_length` |
//! | `listName`   | queue (list) name       | configuration error    |
//! | `address`    | store `host:port`       | `defaults.address`     |
//! | `password`   | store password          | `defaults.password`    |
//!
//! An empty `address` or `password` counts as absent.

use std::collections::HashMap;

use listscale_store::{PoolKey, QueueTarget};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ScalerError, ScalerResult};

/// Metric name published by both the metric spec and the metric value.
pub const METRIC_NAME: &str = "RedisListLength";

pub const DEFAULT_LIST_LENGTH: i64 = 5;
pub const DEFAULT_ADDRESS: &str = "redis-master.default.svc.cluster.local:6379";

const KEY_LIST_LENGTH: &str = "listLength";
const KEY_LIST_NAME: &str = "listName";
const KEY_ADDRESS: &str = "address";
const KEY_PASSWORD: &str = "password";

/// Fallback values for metadata keys the controller leaves out.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScalerDefaults {
    pub address: String,
    pub password: String,
    pub list_length: i64,
}

impl Default for ScalerDefaults {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            password: String::new(),
            list_length: DEFAULT_LIST_LENGTH,
        }
    }
}

impl std::fmt::Debug for ScalerDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalerDefaults")
            .field("address", &self.address)
            .field("password", &redacted(&self.password))
            .field("list_length", &self.list_length)
            .finish()
    }
}

/// Configuration for one registered workload.
#[derive(Clone, PartialEq, Eq)]
pub struct ScalerEntry {
    pub address: String,
    pub password: String,
    pub list_name: String,
    /// Target load threshold reported in the metric spec.
    pub list_length: i64,
}

impl ScalerEntry {
    /// Parse registration metadata into an entry.
    pub fn from_metadata(
        metadata: &HashMap<String, String>,
        defaults: &ScalerDefaults,
    ) -> ScalerResult<Self> {
        let list_length = match metadata.get(KEY_LIST_LENGTH) {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                ScalerError::Configuration(format!("list length parsing error {raw:?}: {e}"))
            })?,
            None => defaults.list_length,
        };

        let list_name = metadata
            .get(KEY_LIST_NAME)
            .cloned()
            .ok_or_else(|| ScalerError::Configuration("no list name given".to_string()))?;

        let address = non_empty(metadata, KEY_ADDRESS).unwrap_or(&defaults.address);
        let password = non_empty(metadata, KEY_PASSWORD).unwrap_or(&defaults.password);

        for key in metadata.keys() {
            if ![KEY_LIST_LENGTH, KEY_LIST_NAME, KEY_ADDRESS, KEY_PASSWORD].contains(&key.as_str()) {
                debug!(%key, "ignoring unrecognised scaler metadata");
            }
        }

        Ok(Self {
            address: address.to_string(),
            password: password.to_string(),
            list_name,
            list_length,
        })
    }

    /// The queue this entry measures.
    pub fn target(&self) -> QueueTarget {
        QueueTarget::new(&self.address, &self.password, &self.list_name)
    }

    /// Pool key of the store connection this entry uses.
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(&self.address, &self.password)
    }
}

impl std::fmt::Debug for ScalerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalerEntry")
            .field("address", &self.address)
            .field("password", &redacted(&self.password))
            .field("list_name", &self.list_name)
            .field("list_length", &self.list_length)
            .finish()
    }
}

fn non_empty<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a String> {
    metadata.get(key).filter(|v| !v.is_empty())
}

fn redacted(password: &str) -> &'static str {
    if password.is_empty() { "" } else { "<redacted>" }
}

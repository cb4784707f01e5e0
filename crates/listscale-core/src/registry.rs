//! Scaler registry — the only shared mutable state in the scaler.
//!
//! Maps [`WorkloadId`] to [`ScalerEntry`] behind a readers-writer lock:
//! lookups share the lock, register and deregister take it exclusively.
//! Lookups hand back an owned copy so callers never hold the lock across
//! a store query.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use listscale_store::PoolKey;
use tracing::debug;

use crate::entry::ScalerEntry;
use crate::identity::WorkloadId;

/// In-memory table of registered scalers, scoped to the process lifetime.
#[derive(Debug, Default)]
pub struct ScalerRegistry {
    entries: RwLock<HashMap<WorkloadId, ScalerEntry>>,
}

impl ScalerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `id`.
    ///
    /// Returns the entry that was replaced, if any.
    pub fn put(&self, id: WorkloadId, entry: ScalerEntry) -> Option<ScalerEntry> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.insert(id.clone(), entry);
        debug!(workload = %id, replaced = previous.is_some(), "scaler entry stored");
        previous
    }

    /// Copy of the entry for `id`.
    pub fn get(&self, id: &WorkloadId) -> Option<ScalerEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).cloned()
    }

    /// Remove the entry for `id`. Absent ids are not an error.
    pub fn remove(&self, id: &WorkloadId) -> Option<ScalerEntry> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.remove(id);
        if removed.is_some() {
            debug!(workload = %id, "scaler entry removed");
        }
        removed
    }

    /// Whether any registered entry still connects through `key`.
    pub fn references_pool(&self, key: &PoolKey) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .values()
            .any(|e| e.address == key.address && e.password == key.password)
    }

    /// Number of registered scalers.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn entry(list_name: &str, list_length: i64) -> ScalerEntry {
        ScalerEntry {
            address: "redis:6379".to_string(),
            password: String::new(),
            list_name: list_name.to_string(),
            list_length,
        }
    }

    #[test]
    fn put_then_get() {
        let registry = ScalerRegistry::new();
        let id = WorkloadId::new("default", "worker");

        assert!(registry.put(id.clone(), entry("jobs", 10)).is_none());
        assert_eq!(registry.get(&id), Some(entry("jobs", 10)));
    }

    #[test]
    fn put_replaces_existing_entry() {
        let registry = ScalerRegistry::new();
        let id = WorkloadId::new("default", "worker");

        registry.put(id.clone(), entry("jobs", 10));
        let previous = registry.put(id.clone(), entry("emails", 3));

        assert_eq!(previous, Some(entry("jobs", 10)));
        assert_eq!(registry.get(&id), Some(entry("emails", 3)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_unknown_is_none() {
        let registry = ScalerRegistry::new();
        assert!(registry.get(&WorkloadId::new("default", "ghost")).is_none());
    }

    #[test]
    fn remove_unknown_is_noop() {
        let registry = ScalerRegistry::new();
        registry.put(WorkloadId::new("default", "worker"), entry("jobs", 5));

        assert!(registry.remove(&WorkloadId::new("default", "ghost")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_deletes_entry() {
        let registry = ScalerRegistry::new();
        let id = WorkloadId::new("default", "worker");
        registry.put(id.clone(), entry("jobs", 5));

        assert_eq!(registry.remove(&id), Some(entry("jobs", 5)));
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn references_pool_tracks_remaining_entries() {
        let registry = ScalerRegistry::new();
        let a = WorkloadId::new("default", "a");
        let b = WorkloadId::new("default", "b");
        registry.put(a.clone(), entry("jobs", 5));
        registry.put(b.clone(), entry("emails", 5));

        let key = entry("jobs", 5).pool_key();
        registry.remove(&a);
        assert!(registry.references_pool(&key));
        registry.remove(&b);
        assert!(!registry.references_pool(&key));
    }

    #[test]
    fn concurrent_put_and_get() {
        let registry = Arc::new(ScalerRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let id = WorkloadId::new("ns", &format!("w{i}"));
                    for n in 0..100 {
                        registry.put(id.clone(), entry("jobs", n));
                        let seen = registry.get(&id).unwrap();
                        assert_eq!(seen.list_name, "jobs");
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
    }
}

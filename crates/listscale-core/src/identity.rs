//! Workload identity — the registry's lookup key.

use std::fmt;

/// Namespace-qualified workload key, `namespace + "/" + name`.
///
/// Case-sensitive and never normalised: two references name the same
/// workload only if both parts match byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadId(String);

impl WorkloadId {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

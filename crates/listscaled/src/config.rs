//! Daemon configuration.
//!
//! Built-in defaults, overridden by an optional TOML file, overridden by
//! command-line flags:
//!
//! ```toml
//! [server]
//! port = 8080
//! cert_path = "/certs"
//! query_timeout_secs = 10
//!
//! [pool]
//! idle_timeout_secs = 300
//! reap_interval_secs = 60
//!
//! [defaults]
//! address = "redis-master.default.svc.cluster.local:6379"
//! password = ""
//! list_length = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use listscale_core::ScalerDefaults;
use listscale_store::PoolConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub server: ServerSection,
    pub pool: PoolSection,
    /// Fallbacks for registration metadata the controller leaves out.
    pub defaults: ScalerDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub port: u16,
    /// Directory holding `server.crt` and `server.key`.
    pub cert_path: Option<PathBuf>,
    pub query_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: listscale_grpc::DEFAULT_PORT,
            cert_path: None,
            query_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSection {
    pub idle_timeout_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for PoolSection {
    fn default() -> Self {
        let pool = PoolConfig::default();
        Self {
            idle_timeout_secs: pool.idle_timeout.as_secs(),
            reap_interval_secs: pool.reap_interval.as_secs(),
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Reject durations that would time out every query or spin the reaper.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.query_timeout_secs == 0 {
            anyhow::bail!("server.query_timeout_secs must be greater than zero");
        }
        if self.pool.idle_timeout_secs == 0 {
            anyhow::bail!("pool.idle_timeout_secs must be greater than zero");
        }
        if self.pool.reap_interval_secs == 0 {
            anyhow::bail!("pool.reap_interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// Load the file if one was given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line flags on top of the file.
    pub fn with_overrides(mut self, port: Option<u16>, cert_path: Option<PathBuf>) -> Self {
        if let Some(port) = port {
            self.server.port = port;
        }
        if cert_path.is_some() {
            self.server.cert_path = cert_path;
        }
        self
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.server.query_timeout_secs)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            idle_timeout: Duration::from_secs(self.pool.idle_timeout_secs),
            reap_interval: Duration::from_secs(self.pool.reap_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.query_timeout(), Duration::from_secs(10));
        assert_eq!(config.pool_config().idle_timeout, Duration::from_secs(300));
        assert_eq!(config.defaults, ScalerDefaults::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9090\n\n[defaults]\nlist_length = 20").unwrap();

        let config = DaemonConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.query_timeout_secs, 10);
        assert_eq!(config.defaults.list_length, 20);
        assert_eq!(config.defaults.address, ScalerDefaults::default().address);
    }

    #[test]
    fn unknown_keys_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nprot = 9090").unwrap();

        assert!(DaemonConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn zero_durations_rejected() {
        for (section, key) in [
            ("server", "query_timeout_secs"),
            ("pool", "idle_timeout_secs"),
            ("pool", "reap_interval_secs"),
        ] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[{section}]\n{key} = 0").unwrap();

            let err = DaemonConfig::from_file(file.path()).unwrap_err();
            assert!(format!("{err:#}").contains(key), "{key}: {err:#}");
        }
    }

    #[test]
    fn defaults_are_valid() {
        DaemonConfig::default().validate().unwrap();
    }

    #[test]
    fn missing_file_names_path() {
        let err = DaemonConfig::from_file(Path::new("/nonexistent/listscaled.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/listscaled.toml"));
    }

    #[test]
    fn flags_override_file() {
        let config = DaemonConfig {
            server: ServerSection {
                port: 9090,
                cert_path: Some(PathBuf::from("/from-file")),
                ..ServerSection::default()
            },
            ..DaemonConfig::default()
        }
        .with_overrides(Some(7070), Some(PathBuf::from("/from-flag")));

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.server.cert_path, Some(PathBuf::from("/from-flag")));
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let config = DaemonConfig {
            server: ServerSection {
                port: 9090,
                cert_path: Some(PathBuf::from("/from-file")),
                ..ServerSection::default()
            },
            ..DaemonConfig::default()
        }
        .with_overrides(None, None);

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.cert_path, Some(PathBuf::from("/from-file")));
    }

    #[test]
    fn pool_section_maps_to_pool_config() {
        let config = DaemonConfig {
            pool: PoolSection {
                idle_timeout_secs: 30,
                reap_interval_secs: 5,
            },
            ..DaemonConfig::default()
        };
        let pool = config.pool_config();
        assert_eq!(pool.idle_timeout, Duration::from_secs(30));
        assert_eq!(pool.reap_interval, Duration::from_secs(5));
    }
}

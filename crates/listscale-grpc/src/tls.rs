//! Server TLS identity.
//!
//! The certificate and key are mounted into one directory as
//! `server.crt` and `server.key` and read once at startup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tonic::transport::{Identity, ServerTlsConfig};
use tracing::info;

pub const CERT_FILE: &str = "server.crt";
pub const KEY_FILE: &str = "server.key";

/// Paths of the certificate and key inside `cert_dir`.
pub fn cert_paths(cert_dir: &Path) -> (PathBuf, PathBuf) {
    (cert_dir.join(CERT_FILE), cert_dir.join(KEY_FILE))
}

/// Read the PEM certificate and key from `cert_dir`.
pub fn load_identity(cert_dir: &Path) -> anyhow::Result<Identity> {
    let (cert_path, key_path) = cert_paths(cert_dir);

    let cert = std::fs::read(&cert_path)
        .with_context(|| format!("reading certificate {}", cert_path.display()))?;
    let key = std::fs::read(&key_path)
        .with_context(|| format!("reading private key {}", key_path.display()))?;

    if !contains_pem(&cert, "CERTIFICATE") {
        anyhow::bail!("{} does not contain a PEM certificate", cert_path.display());
    }
    if !contains_pem(&key, "PRIVATE KEY") {
        anyhow::bail!("{} does not contain a PEM private key", key_path.display());
    }

    info!(cert = %cert_path.display(), "loaded server TLS identity");
    Ok(Identity::from_pem(cert, key))
}

/// TLS configuration for the gRPC server.
pub fn server_tls_config(cert_dir: &Path) -> anyhow::Result<ServerTlsConfig> {
    Ok(ServerTlsConfig::new().identity(load_identity(cert_dir)?))
}

fn contains_pem(data: &[u8], label: &str) -> bool {
    let marker = format!("-----BEGIN {label}");
    String::from_utf8_lossy(data).contains(&marker)
}

#[cfg(test)]
mod tests {
    use rcgen::{CertifiedKey, generate_simple_self_signed};

    use super::*;

    fn write_self_signed(dir: &Path) {
        let CertifiedKey { cert, key_pair } =
            generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        std::fs::write(dir.join(CERT_FILE), cert.pem()).unwrap();
        std::fs::write(dir.join(KEY_FILE), key_pair.serialize_pem()).unwrap();
    }

    #[test]
    fn loads_generated_identity() {
        let dir = tempfile::tempdir().unwrap();
        write_self_signed(dir.path());

        assert!(load_identity(dir.path()).is_ok());
        assert!(server_tls_config(dir.path()).is_ok());
    }

    #[test]
    fn missing_files_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_identity(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains(CERT_FILE));
    }

    #[test]
    fn rejects_non_pem_key() {
        let dir = tempfile::tempdir().unwrap();
        write_self_signed(dir.path());
        std::fs::write(dir.path().join(KEY_FILE), b"not a key").unwrap();

        let err = load_identity(dir.path()).unwrap_err();
        assert!(err.to_string().contains(KEY_FILE));
    }

    #[test]
    fn cert_paths_join_directory() {
        let (cert, key) = cert_paths(Path::new("/certs"));
        assert_eq!(cert, PathBuf::from("/certs/server.crt"));
        assert_eq!(key, PathBuf::from("/certs/server.key"));
    }
}

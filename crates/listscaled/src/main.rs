//! listscaled — the Redis list external scaler daemon.
//!
//! Assembles the scaler and serves it over gRPC:
//! - Redis list source with pooled connections + idle reaper
//! - List scaler (registry + operations)
//! - TLS gRPC server on `0.0.0.0:<port>`
//!
//! # Usage
//!
//! ```text
//! CERT_PATH=/certs listscaled serve --port 8080
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use listscale_core::ListScaler;
use listscale_grpc::ScalerGrpcServer;
use listscale_store::RedisListSource;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "listscaled", about = "Redis list external scaler")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the external scaler gRPC service.
    Serve {
        /// Port to listen on (default 8080).
        #[arg(long)]
        port: Option<u16>,

        /// Directory containing server.crt and server.key.
        #[arg(long, env = "CERT_PATH")]
        cert_path: Option<PathBuf>,

        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Serve plaintext gRPC. Local development only.
        #[arg(long)]
        insecure: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve {
            port,
            cert_path,
            config,
            insecure,
        } => {
            let config = DaemonConfig::load(config.as_deref())?.with_overrides(port, cert_path);
            run_serve(config, insecure).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,listscaled=debug,listscale=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run_serve(config: DaemonConfig, insecure: bool) -> anyhow::Result<()> {
    info!(defaults = ?config.defaults, "listscaled starting");

    // ── TLS ────────────────────────────────────────────────────

    let mut builder = tonic::transport::Server::builder();
    if insecure {
        warn!("serving plaintext gRPC, TLS disabled");
    } else {
        let cert_dir = config
            .server
            .cert_path
            .as_deref()
            .context("no certificate directory: set CERT_PATH or pass --cert-path")?;
        builder = builder.tls_config(listscale_grpc::tls::server_tls_config(cert_dir)?)?;
    }

    // ── Scaler ─────────────────────────────────────────────────

    let source = Arc::new(RedisListSource::new(config.pool_config()));
    let scaler = Arc::new(
        ListScaler::new(Arc::clone(&source))
            .with_defaults(config.defaults.clone())
            .with_query_timeout(config.query_timeout()),
    );
    let grpc = ScalerGrpcServer::new(scaler);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────

    let reaper_source = Arc::clone(&source);
    let reaper_handle = tokio::spawn(async move {
        reaper_source.run_reaper(shutdown_rx).await;
    });

    // ── gRPC server ────────────────────────────────────────────

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, tls = !insecure, "gRPC server starting");

    builder
        .add_service(grpc.into_service())
        .serve_with_shutdown(addr, async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = reaper_handle.await;

    info!("listscaled stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

//! omaha-serve-package binary entry point
//!
//! Serves a single update payload to any Omaha client that asks, for
//! testing update clients by hand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use omaha::TrivialServer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name every client downloads the payload as.
const PACKAGE_NAME: &str = "update.gz";

/// Serve one update payload over the Omaha protocol
#[derive(Parser, Debug)]
#[command(name = "omaha-serve-package")]
#[command(version, about = "Serve one update payload over the Omaha protocol")]
struct Cli {
    /// Path to the update payload
    #[arg(long, env = "OMAHA_PACKAGE_FILE")]
    package_file: PathBuf,

    /// Version offered to clients
    #[arg(long, env = "OMAHA_PACKAGE_VERSION")]
    package_version: String,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen_address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let server = TrivialServer::bind(&cli.listen_address)
        .await
        .with_context(|| format!("failed to listen on {}", cli.listen_address))?;
    server.set_version(&cli.package_version).await;
    server
        .add_package(&cli.package_file, PACKAGE_NAME)
        .await
        .with_context(|| format!("failed to add package {}", cli.package_file.display()))?;

    info!(
        "Serving {} as version {} on {}",
        cli.package_file.display(),
        cli.package_version,
        server.local_addr()?
    );

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shutdown.shutdown();
        }
    });

    server.serve().await.context("server exited with an error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_flags() {
        assert!(Cli::try_parse_from(["omaha-serve-package"]).is_err());
        assert!(Cli::try_parse_from(["omaha-serve-package", "--package-file", "u.gz"]).is_err());
    }

    #[test]
    fn test_default_listen_address() {
        let cli = Cli::try_parse_from([
            "omaha-serve-package",
            "--package-file",
            "update.gz",
            "--package-version",
            "1.2.3",
        ])
        .unwrap();
        assert_eq!(cli.package_file, PathBuf::from("update.gz"));
        assert_eq!(cli.package_version, "1.2.3");
        assert_eq!(cli.listen_address, "0.0.0.0:8000");
    }
}

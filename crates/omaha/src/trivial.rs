//! Single-version update server for manual testing.
//!
//! [`TrivialUpdater`] offers one version made of locally stored package
//! files to every client. [`TrivialServer`] pairs it with a `/packages/`
//! route so the files can be downloaded from the URL it advertises.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::codes::{AppStatus, UpdateStatus};
use crate::handler::{Update, Updater};
use crate::protocol::{AppRequest, EventRequest, Manifest, Package, Request, Url};
use crate::server::{omaha_router, Server, ShutdownHandle};

const PACKAGES_PATH: &str = "/packages/";

#[derive(Default)]
struct Offer {
    version: Option<String>,
    packages: Vec<Package>,
    files: HashMap<String, PathBuf>,
}

/// Offers the configured version, and its packages, to every app.
pub struct TrivialUpdater {
    base_url: String,
    offer: RwLock<Offer>,
}

impl TrivialUpdater {
    /// `base_url` is advertised as the download location of all packages.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            offer: RwLock::new(Offer::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Version offered to clients. Until this is called every check gets
    /// `noupdate`.
    pub async fn set_version(&self, version: impl Into<String>) {
        let version = version.into();
        info!("Offering version {}", version);
        self.offer.write().await.version = Some(version);
    }

    /// Register `path` as package `name`, computing its digests and size.
    pub async fn add_package(&self, path: impl AsRef<FsPath>, name: &str) -> io::Result<()> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid package name {name:?}"),
            ));
        }

        let path = path.as_ref().to_path_buf();
        let data = tokio::fs::read(&path).await?;
        let package = Package {
            name: name.to_string(),
            sha1: Some(STANDARD.encode(Sha1::digest(&data))),
            sha256: Some(STANDARD.encode(Sha256::digest(&data))),
            size: data.len() as u64,
            required: true,
        };
        info!("Added package {} ({} bytes) from {}", name, package.size, path.display());

        let mut offer = self.offer.write().await;
        offer.packages.retain(|p| p.name != name);
        offer.packages.push(package);
        offer.files.insert(name.to_string(), path);
        Ok(())
    }

    async fn package_file(&self, name: &str) -> Option<PathBuf> {
        self.offer.read().await.files.get(name).cloned()
    }
}

#[async_trait]
impl Updater for TrivialUpdater {
    async fn check_app(&self, _req: &Request, _app: &AppRequest) -> Result<(), AppStatus> {
        Ok(())
    }

    async fn check_update(&self, _req: &Request, _app: &AppRequest) -> Result<Update, UpdateStatus> {
        let offer = self.offer.read().await;
        let Some(version) = offer.version.clone() else {
            return Err(UpdateStatus::NoUpdate);
        };

        let mut manifest = Manifest {
            version,
            packages: offer.packages.clone(),
            ..Default::default()
        };
        let sha256 = offer.packages.first().and_then(|p| p.sha256.clone());
        manifest.add_action("postinstall").sha256 = sha256;

        Ok(Update {
            urls: vec![Url {
                codebase: self.base_url.clone(),
            }],
            manifest,
        })
    }

    async fn event(&self, _req: &Request, _app: &AppRequest, _event: &EventRequest) {}

    async fn ping(&self, _req: &Request, _app: &AppRequest) {}
}

/// GET /packages/{name} - Download a registered package
async fn package_handler(
    State(updater): State<Arc<TrivialUpdater>>,
    Path(name): Path<String>,
) -> Response {
    let Some(path) = updater.package_file(&name).await else {
        return (StatusCode::NOT_FOUND, "Package not found").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(data) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            data,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to read package {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Package unavailable").into_response()
        }
    }
}

/// A [`Server`] backed by a [`TrivialUpdater`] that also serves the packages.
pub struct TrivialServer {
    updater: Arc<TrivialUpdater>,
    server: Server,
}

impl TrivialServer {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let base_url = format!("http://{}{}", listener.local_addr()?, PACKAGES_PATH);
        let updater = Arc::new(TrivialUpdater::new(base_url));

        let packages = Router::new()
            .route("/packages/:name", get(package_handler))
            .with_state(updater.clone());
        let router = omaha_router(updater.clone()).merge(packages);

        Ok(Self {
            updater,
            server: Server::from_parts(listener, router),
        })
    }

    pub fn updater(&self) -> &Arc<TrivialUpdater> {
        &self.updater
    }

    pub async fn set_version(&self, version: impl Into<String>) {
        self.updater.set_version(version).await;
    }

    pub async fn add_package(&self, path: impl AsRef<FsPath>, name: &str) -> io::Result<()> {
        self.updater.add_package(path, name).await
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.server.shutdown_handle()
    }

    pub async fn serve(self) -> io::Result<()> {
        self.server.serve().await
    }
}

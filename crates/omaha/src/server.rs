//! HTTP front end for an [`Updater`].

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::codec::{decode_request, encode_response, XML_CONTENT_TYPE};
use crate::handler::{handle_request, Updater};

/// Routes Omaha POSTs to `updater`.
///
/// Requests are accepted on `/v1/update`, `/v1/update/` and `/`. Other
/// methods get 405, undecodable bodies 400.
pub fn omaha_router(updater: Arc<dyn Updater>) -> Router {
    Router::new()
        .route("/v1/update", post(omaha_handler))
        .route("/v1/update/", post(omaha_handler))
        .route("/", post(omaha_handler))
        .with_state(updater)
}

/// POST an Omaha request
async fn omaha_handler(
    State(updater): State<Arc<dyn Updater>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let request = match decode_request(content_type, &body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Failed to parse omaha request: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let response = handle_request(&request, updater.as_ref()).await;
    match encode_response(&response) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode omaha response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Stops a running [`Server`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting connections. Safe to call before
    /// `serve` starts.
    pub fn shutdown(&self) {
        self.notify.notify_one();
    }
}

/// An Omaha server bound to a local socket.
pub struct Server {
    listener: TcpListener,
    router: Router,
    shutdown: Arc<Notify>,
}

impl Server {
    /// Bind `addr` and route requests to `updater`.
    pub async fn bind(addr: impl ToSocketAddrs, updater: Arc<dyn Updater>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_parts(listener, omaha_router(updater)))
    }

    pub(crate) fn from_parts(listener: TcpListener, router: Router) -> Self {
        Self {
            listener,
            router,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            notify: self.shutdown.clone(),
        }
    }

    /// Serve until the shutdown handle fires.
    pub async fn serve(self) -> io::Result<()> {
        let app = self
            .router
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        info!("Omaha server listening on {}", self.listener.local_addr()?);

        let shutdown = self.shutdown;
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await?;

        info!("Omaha server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_response, encode_request};
    use crate::codes::UpdateStatus;
    use crate::handler::UpdaterStub;
    use crate::protocol::Request;

    async fn start() -> (String, ShutdownHandle, tokio::task::JoinHandle<io::Result<()>>) {
        let server = Server::bind("127.0.0.1:0", Arc::new(UpdaterStub)).await.unwrap();
        let url = format!("http://{}/v1/update/", server.local_addr().unwrap());
        let handle = server.shutdown_handle();
        let task = tokio::spawn(server.serve());
        (url, handle, task)
    }

    fn request_body() -> Vec<u8> {
        let mut req = Request::new();
        let app = req.add_app("{app}", "1.0.0");
        app.add_ping();
        app.add_update_check();
        encode_request(&req).unwrap()
    }

    #[tokio::test]
    async fn test_post_update_check() {
        let (url, handle, task) = start().await;

        let resp = reqwest::Client::new()
            .post(&url)
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(request_body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert_eq!(content_type, XML_CONTENT_TYPE);

        let body = resp.bytes().await.unwrap();
        let decoded = decode_response(&content_type, &body).unwrap();
        let app = decoded.app("{app}").unwrap();
        assert_eq!(app.update_check.as_ref().unwrap().status, UpdateStatus::NoUpdate);

        handle.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let (url, handle, task) = start().await;
        let client = reqwest::Client::new();

        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), 405);

        let resp = client.post(&url).body("not xml").send().await.unwrap();
        assert_eq!(resp.status(), 400);

        let resp = client
            .post(&url)
            .header("Content-Type", "text/plain")
            .body(request_body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        handle.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_serve() {
        let server = Server::bind("127.0.0.1:0", Arc::new(UpdaterStub)).await.unwrap();
        server.shutdown_handle().shutdown();
        server.serve().await.unwrap();
    }
}

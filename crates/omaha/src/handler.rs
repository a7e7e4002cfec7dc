//! Server-side dispatch contract.
//!
//! An [`Updater`] decides, per application, whether the app is known and
//! whether an update is available. [`handle_request`] walks a decoded
//! request and assembles the response from those decisions.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::codes::{AppStatus, UpdateStatus};
use crate::protocol::{AppRequest, EventRequest, Manifest, Request, Response, Url};

/// An available update: download locations plus its manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub urls: Vec<Url>,
    pub manifest: Manifest,
}

/// Decisions a server makes for each application in a request.
#[async_trait]
pub trait Updater: Send + Sync {
    /// Accept or reject the application. Returning `Err(AppStatus::Ok)` is
    /// treated as an internal error.
    async fn check_app(&self, req: &Request, app: &AppRequest) -> Result<(), AppStatus>;

    /// Offer an update, or explain why there is none. `Err(NoUpdate)` is the
    /// ordinary "up to date" answer.
    async fn check_update(&self, req: &Request, app: &AppRequest) -> Result<Update, UpdateStatus>;

    /// Observe an event; it is always acknowledged.
    async fn event(&self, req: &Request, app: &AppRequest, event: &EventRequest);

    /// Observe a ping; it is always acknowledged.
    async fn ping(&self, req: &Request, app: &AppRequest);
}

/// Accepts every app and never offers an update.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdaterStub;

#[async_trait]
impl Updater for UpdaterStub {
    async fn check_app(&self, _req: &Request, _app: &AppRequest) -> Result<(), AppStatus> {
        Ok(())
    }

    async fn check_update(&self, _req: &Request, _app: &AppRequest) -> Result<Update, UpdateStatus> {
        Err(UpdateStatus::NoUpdate)
    }

    async fn event(&self, _req: &Request, _app: &AppRequest, _event: &EventRequest) {}

    async fn ping(&self, _req: &Request, _app: &AppRequest) {}
}

/// Build the response to `req`, one response app per request app, in order.
pub async fn handle_request(req: &Request, updater: &dyn Updater) -> Response {
    let mut resp = Response::new();

    for app_req in &req.apps {
        let app_resp = resp.add_app(app_req.id.clone(), AppStatus::Ok);

        if let Err(status) = updater.check_app(req, app_req).await {
            let status = if status.is_ok() {
                AppStatus::InternalError
            } else {
                status
            };
            info!(app_id = %app_req.id, %status, "rejected app");
            app_resp.status = status;
            continue;
        }

        if app_req.update_check.is_some() {
            match updater.check_update(req, app_req).await {
                Ok(update) => {
                    info!(
                        app_id = %app_req.id,
                        version = %update.manifest.version,
                        "offering update"
                    );
                    let check = app_resp.add_update_check(UpdateStatus::Ok);
                    check.urls = update.urls;
                    check.manifest = Some(update.manifest);
                }
                Err(status) => {
                    // An "ok" without an update cannot be encoded.
                    let status = if status.is_ok() {
                        UpdateStatus::InternalError
                    } else {
                        status
                    };
                    debug!(app_id = %app_req.id, %status, "no update offered");
                    app_resp.add_update_check(status);
                }
            }
        }

        for event in &app_req.events {
            debug!(app_id = %app_req.id, event_type = %event.event_type, result = %event.result, "event");
            updater.event(req, app_req, event).await;
            app_resp.add_event();
        }

        if app_req.ping.is_some() {
            updater.ping(req, app_req).await;
            app_resp.add_ping();
        }
    }

    resp
}

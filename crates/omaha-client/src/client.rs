//! Client session and per-application handles.
//!
//! A [`Client`] owns the identity shared by every request (server endpoint,
//! updater version, user and session ids) and a registry of [`AppClient`]s.
//! App clients hold a shared handle to that session, so they stay usable
//! on their own and observe endpoint changes made through the client.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use omaha::{AppRequest, AppResponse, EventRequest, Request, UpdateResponse, UpdateStatus};
use parking_lot::RwLock;
use reqwest::Url;
use tokio::sync::oneshot;
use tokio::time::Sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClientConfig, ScheduleConfig};
use crate::error::OmahaError;
use crate::events::describe_event;
use crate::fuzzy::fuzzy_after;
use crate::http::HttpTransport;
use crate::machine::MachineIdentity;

/// Path assumed when a server URL has none.
pub const DEFAULT_UPDATE_PATH: &str = "/v1/update/";

const STATUS_OK: &str = "ok";

/// Outcome of a successful update check.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCheckResult {
    /// An update is offered; the response carries URLs and a manifest.
    Available(UpdateResponse),
    /// The application is up to date.
    NoUpdate,
    /// The server answered the check with another status.
    Declined(UpdateStatus),
}

/// State shared by a client and all of its app clients.
struct Session {
    transport: HttpTransport,
    endpoint: RwLock<String>,
    client_version: RwLock<String>,
    user_id: String,
    session_id: String,
    is_machine: bool,
    sent_ping: AtomicBool,
    schedule: ScheduleConfig,
}

impl Session {
    fn endpoint(&self) -> String {
        self.endpoint.read().clone()
    }

    /// Send a one-app request and return that app's accepted response.
    async fn send_app(&self, url: &str, req: &Request) -> Result<AppResponse, OmahaError> {
        let app_id = req.apps.first().map(|app| app.id.as_str()).unwrap_or_default();
        let mut resp = self.transport.send(url, req).await?;

        let index = resp
            .apps
            .iter()
            .position(|app| app.id == app_id)
            .ok_or_else(|| {
                OmahaError::ProtocolInvalid(format!("app {app_id} missing from response"))
            })?;
        let app = resp.apps.swap_remove(index);

        if !app.status.is_ok() {
            warn!("Server rejected app {}: {}", app_id, app.status);
            return Err(OmahaError::AppStatus(app.status));
        }
        Ok(app)
    }
}

fn check_ping(app: &AppResponse) -> Result<(), OmahaError> {
    let ping = app
        .ping
        .as_ref()
        .ok_or_else(|| OmahaError::ProtocolInvalid("ping status missing from response".into()))?;
    if ping.status != STATUS_OK {
        return Err(OmahaError::PingStatus(ping.status.clone()));
    }
    Ok(())
}

fn check_event(app: &AppResponse) -> Result<(), OmahaError> {
    let event = app
        .events
        .first()
        .ok_or_else(|| OmahaError::ProtocolInvalid("event status missing from response".into()))?;
    if event.status != STATUS_OK {
        return Err(OmahaError::EventStatus(event.status.clone()));
    }
    Ok(())
}

/// Validate a server URL, defaulting an empty path to `/v1/update/`.
fn normalize_server_url(server_url: &str) -> Result<String, OmahaError> {
    let mut url = Url::parse(server_url)
        .map_err(|e| OmahaError::Config(format!("invalid server URL {server_url:?}: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(OmahaError::Config(format!(
            "invalid server protocol: {server_url}"
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(OmahaError::Config(format!("invalid server host: {server_url}")));
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_UPDATE_PATH);
    }
    Ok(url.to_string())
}

/// Omaha client managing one or more applications against one server.
pub struct Client {
    session: Arc<Session>,
    apps: HashMap<String, AppClient>,
}

impl Client {
    /// Create a client for `server_url`. `user_id` must persistently and
    /// uniquely identify this installation.
    pub fn new(server_url: &str, user_id: &str) -> Result<Self, OmahaError> {
        Self::with_config(server_url, user_id, ClientConfig::default())
    }

    pub fn with_config(
        server_url: &str,
        user_id: &str,
        config: ClientConfig,
    ) -> Result<Self, OmahaError> {
        if user_id.is_empty() {
            return Err(OmahaError::Config("empty user identifier".into()));
        }
        let session_id = Uuid::new_v4().to_string();
        Self::build(server_url, user_id.to_string(), session_id, false, config)
    }

    /// Machine-wide client using the host's machine id and boot id.
    #[cfg(target_os = "linux")]
    pub fn new_machine(server_url: &str) -> Result<Self, OmahaError> {
        let identity = MachineIdentity::read()?;
        Self::with_machine_identity(server_url, &identity, ClientConfig::default())
    }

    /// Machine-wide client reporting `identity` as its user and session.
    pub fn with_machine_identity(
        server_url: &str,
        identity: &MachineIdentity,
        config: ClientConfig,
    ) -> Result<Self, OmahaError> {
        Self::build(
            server_url,
            identity.machine_id().to_string(),
            identity.boot_id().to_string(),
            true,
            config,
        )
    }

    fn build(
        server_url: &str,
        user_id: String,
        session_id: String,
        is_machine: bool,
        config: ClientConfig,
    ) -> Result<Self, OmahaError> {
        let endpoint = normalize_server_url(server_url)?;
        let transport = HttpTransport::with_config(&config.network)?;
        debug!("Created omaha client for {} (session {})", endpoint, session_id);

        let session = Session {
            transport,
            endpoint: RwLock::new(endpoint),
            client_version: RwLock::new(config.client_version),
            user_id,
            session_id,
            is_machine,
            sent_ping: AtomicBool::new(false),
            schedule: config.schedule,
        };

        Ok(Self {
            session: Arc::new(session),
            apps: HashMap::new(),
        })
    }

    /// Change the server; app clients pick up the new endpoint.
    pub fn set_server_url(&self, server_url: &str) -> Result<(), OmahaError> {
        let endpoint = normalize_server_url(server_url)?;
        *self.session.endpoint.write() = endpoint;
        Ok(())
    }

    pub fn server_url(&self) -> String {
        self.session.endpoint()
    }

    /// Identity of this updater, e.g. `update_engine-0.4.0`.
    pub fn set_client_version(&self, client_version: impl Into<String>) {
        *self.session.client_version.write() = client_version.into();
    }

    pub fn client_version(&self) -> String {
        self.session.client_version.read().clone()
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn is_machine(&self) -> bool {
        self.session.is_machine
    }

    /// Timer for the next ping or update check: shortly after start until
    /// a ping has been sent, then at the regular interval.
    pub fn next_ping(&self) -> Sleep {
        let schedule = &self.session.schedule;
        let base = if self.session.sent_ping.load(Ordering::SeqCst) {
            schedule.ping_interval()
        } else {
            schedule.first_ping()
        };
        fuzzy_after(base, schedule.ping_fuzz())
    }

    /// Register a new application.
    pub fn new_app_client(&mut self, app_id: &str, version: &str) -> Result<AppClient, OmahaError> {
        if self.apps.contains_key(app_id) {
            return Err(OmahaError::Config(format!("duplicate app client {app_id:?}")));
        }
        if version.is_empty() {
            return Err(OmahaError::Config("empty application version".into()));
        }

        let app = AppClient {
            session: self.session.clone(),
            state: Arc::new(RwLock::new(AppState {
                app_id: app_id.to_string(),
                version: version.to_string(),
                track: None,
                oem: None,
            })),
        };
        self.apps.insert(app_id.to_string(), app.clone());
        Ok(app)
    }

    pub fn app_client(&self, app_id: &str) -> Option<&AppClient> {
        self.apps.get(app_id)
    }

    /// Rename a registered application.
    pub fn set_app_id(&mut self, app_id: &str, new_app_id: &str) -> Result<(), OmahaError> {
        if app_id == new_app_id {
            return Ok(());
        }
        if self.apps.contains_key(new_app_id) {
            return Err(OmahaError::Config(format!("duplicate app {new_app_id:?}")));
        }
        let app = self
            .apps
            .remove(app_id)
            .ok_or_else(|| OmahaError::Config(format!("missing app client {app_id:?}")))?;
        app.state.write().app_id = new_app_id.to_string();
        self.apps.insert(new_app_id.to_string(), app);
        Ok(())
    }
}

/// Single-application client.
///
/// Shorthand for [`Client::new`] followed by [`Client::new_app_client`].
pub fn new_app_client(
    server_url: &str,
    user_id: &str,
    app_id: &str,
    version: &str,
) -> Result<AppClient, OmahaError> {
    Client::new(server_url, user_id)?.new_app_client(app_id, version)
}

struct AppState {
    app_id: String,
    version: String,
    track: Option<String>,
    oem: Option<String>,
}

/// Handle for one application registered with a [`Client`].
#[derive(Clone)]
pub struct AppClient {
    session: Arc<Session>,
    state: Arc<RwLock<AppState>>,
}

impl fmt::Debug for AppClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("AppClient")
            .field("app_id", &state.app_id)
            .field("version", &state.version)
            .field("endpoint", &self.session.endpoint())
            .finish_non_exhaustive()
    }
}

impl AppClient {
    pub fn app_id(&self) -> String {
        self.state.read().app_id.clone()
    }

    pub fn version(&self) -> String {
        self.state.read().version.clone()
    }

    pub fn set_version(&self, version: &str) -> Result<(), OmahaError> {
        if version.is_empty() {
            return Err(OmahaError::Config("empty application version".into()));
        }
        self.state.write().version = version.to_string();
        Ok(())
    }

    pub fn track(&self) -> Option<String> {
        self.state.read().track.clone()
    }

    /// Update track or group, an update_engine extension.
    pub fn set_track(&self, track: &str) -> Result<(), OmahaError> {
        if track.is_empty() {
            return Err(OmahaError::Config(
                "empty application update track/group".into(),
            ));
        }
        self.state.write().track = Some(track.to_string());
        Ok(())
    }

    pub fn oem(&self) -> Option<String> {
        self.state.read().oem.clone()
    }

    /// OEM name, an update_engine extension.
    pub fn set_oem(&self, oem: &str) {
        self.state.write().oem = Some(oem.to_string());
    }

    /// A one-app request carrying the session identity. The app's
    /// `machineid` and `bootid` mirror the user and session ids.
    pub fn new_request(&self) -> Request {
        self.build_request(|_| {})
    }

    fn build_request(&self, configure: impl FnOnce(&mut AppRequest)) -> Request {
        let session = &self.session;
        let mut req = Request::new();
        req.version = Some(session.client_version.read().clone());
        req.user_id = Some(session.user_id.clone());
        req.session_id = Some(session.session_id.clone());
        req.is_machine = session.is_machine;

        let state = self.state.read();
        let app = req.add_app(state.app_id.clone(), state.version.clone());
        app.track = state.track.clone();
        app.oem = state.oem.clone();
        app.machine_id = Some(session.user_id.clone());
        app.boot_id = Some(session.session_id.clone());
        configure(app);
        req
    }

    /// Ask whether a newer version is available. The request also counts
    /// as a ping.
    pub async fn update_check(&self) -> Result<UpdateCheckResult, OmahaError> {
        let req = self.build_request(|app| {
            app.add_ping();
            app.add_update_check();
        });
        self.session.sent_ping.store(true, Ordering::SeqCst);

        let app = self.session.send_app(&self.session.endpoint(), &req).await?;
        check_ping(&app)?;
        let check = app.update_check.ok_or_else(|| {
            OmahaError::ProtocolInvalid("update check missing from response".into())
        })?;

        let result = match check.status {
            UpdateStatus::Ok => {
                info!(
                    "Update available for {}: {}",
                    app.id,
                    check
                        .manifest
                        .as_ref()
                        .map(|m| m.version.as_str())
                        .unwrap_or("unknown version")
                );
                UpdateCheckResult::Available(check)
            }
            UpdateStatus::NoUpdate => {
                debug!("No update for {}", app.id);
                UpdateCheckResult::NoUpdate
            }
            status => {
                info!("Update check for {} declined: {}", app.id, status);
                UpdateCheckResult::Declined(status)
            }
        };
        Ok(result)
    }

    /// Report presence without checking for updates.
    pub async fn ping(&self) -> Result<(), OmahaError> {
        let req = self.build_request(|app| {
            app.add_ping();
        });
        self.session.sent_ping.store(true, Ordering::SeqCst);

        let app = self.session.send_app(&self.session.endpoint(), &req).await?;
        check_ping(&app)
    }

    /// Send `event` in the background.
    ///
    /// The request is built immediately from the current state; the result
    /// arrives on the returned channel, which may be dropped. Must be called
    /// within a Tokio runtime.
    pub fn event(&self, event: EventRequest) -> oneshot::Receiver<Result<(), OmahaError>> {
        let (tx, rx) = oneshot::channel();
        let url = self.session.endpoint();
        let description = describe_event(&event);
        let req = self.build_request(move |app| app.add_event(event));
        let session = self.session.clone();

        tokio::spawn(async move {
            let result = match session.send_app(&url, &req).await {
                Ok(app) => check_event(&app),
                Err(e) => Err(e),
            };
            match &result {
                Ok(()) => debug!("Sent {}", description),
                Err(e) => warn!("Failed to send {}: {}", description, e),
            }
            let _ = tx.send(result);
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use omaha::{
        AppStatus, EventResult, EventType, Manifest, PingRequest, Server, ShutdownHandle, Update,
        UpdateRequest, Updater,
    };

    use crate::error::ErrorKind;

    #[derive(Default)]
    struct Recorder {
        update: Option<Update>,
        decline: Option<UpdateStatus>,
        reject: Option<AppStatus>,
        problems: Mutex<Vec<String>>,
        checks: Mutex<Vec<Option<UpdateRequest>>>,
        events: Mutex<Vec<EventRequest>>,
        pings: Mutex<Vec<Option<PingRequest>>>,
        requests: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl Updater for Recorder {
        // Accepts any id; a convenient place to check requests are well formed.
        async fn check_app(&self, req: &Request, app: &AppRequest) -> Result<(), AppStatus> {
            let mut problems = self.problems.lock().unwrap();
            let session_id = req.session_id.clone().unwrap_or_default();
            let user_id = req.user_id.clone().unwrap_or_default();
            if session_id.len() != 36 {
                problems.push(format!("session id {session_id:?} is not a UUID"));
            }
            if app.boot_id.as_deref() != Some(session_id.as_str()) {
                problems.push(format!("boot id {:?} != session id", app.boot_id));
            }
            if user_id.is_empty() {
                problems.push("user id is blank".into());
            }
            if app.machine_id.as_deref() != Some(user_id.as_str()) {
                problems.push(format!("machine id {:?} != user id", app.machine_id));
            }
            if app.version.as_deref().unwrap_or_default().is_empty() {
                problems.push("app version is blank".into());
            }
            self.requests.lock().unwrap().push(req.clone());

            match &self.reject {
                Some(status) => Err(status.clone()),
                None => Ok(()),
            }
        }

        async fn check_update(&self, _req: &Request, app: &AppRequest) -> Result<Update, UpdateStatus> {
            self.checks.lock().unwrap().push(app.update_check.clone());
            if let Some(status) = &self.decline {
                return Err(status.clone());
            }
            self.update.clone().ok_or(UpdateStatus::NoUpdate)
        }

        async fn event(&self, _req: &Request, _app: &AppRequest, event: &EventRequest) {
            self.events.lock().unwrap().push(event.clone());
        }

        async fn ping(&self, _req: &Request, app: &AppRequest) {
            self.pings.lock().unwrap().push(app.ping.clone());
        }
    }

    async fn recording_server(recorder: Recorder) -> (Arc<Recorder>, String, ShutdownHandle) {
        let recorder = Arc::new(recorder);
        let server = Server::bind("127.0.0.1:0", recorder.clone()).await.unwrap();
        let url = format!("http://{}", server.local_addr().unwrap());
        let handle = server.shutdown_handle();
        tokio::spawn(server.serve());
        (recorder, url, handle)
    }

    fn assert_well_formed(recorder: &Recorder) {
        let problems = recorder.problems.lock().unwrap();
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[tokio::test]
    async fn test_client_no_update() {
        let (recorder, url, handle) = recording_server(Recorder::default()).await;

        let app = new_app_client(&url, "client-id", "app-id", "0.0.0").unwrap();
        let result = app.update_check().await.unwrap();
        assert_eq!(result, UpdateCheckResult::NoUpdate);

        assert_eq!(recorder.pings.lock().unwrap().len(), 1);
        assert_eq!(recorder.checks.lock().unwrap().len(), 1);
        assert_well_formed(&recorder);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_client_with_update() {
        let update = Update {
            manifest: Manifest {
                version: "1.1.1".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let (recorder, url, handle) = recording_server(Recorder {
            update: Some(update),
            ..Default::default()
        })
        .await;

        let app = new_app_client(&url, "client-id", "app-id", "0.0.0").unwrap();
        let UpdateCheckResult::Available(check) = app.update_check().await.unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(check.manifest.unwrap().version, "1.1.1");

        assert_eq!(recorder.pings.lock().unwrap().len(), 1);
        assert_eq!(recorder.checks.lock().unwrap().len(), 1);
        assert_well_formed(&recorder);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_client_declined() {
        let (_recorder, url, handle) = recording_server(Recorder {
            decline: Some(UpdateStatus::OsNotSupported),
            ..Default::default()
        })
        .await;

        let app = new_app_client(&url, "client-id", "app-id", "0.0.0").unwrap();
        let result = app.update_check().await.unwrap();
        assert_eq!(result, UpdateCheckResult::Declined(UpdateStatus::OsNotSupported));
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_client_app_rejected() {
        let (recorder, url, handle) = recording_server(Recorder {
            reject: Some(AppStatus::UnknownId),
            ..Default::default()
        })
        .await;

        let app = new_app_client(&url, "client-id", "app-id", "0.0.0").unwrap();
        let err = app.update_check().await.unwrap_err();
        assert!(matches!(err, OmahaError::AppStatus(AppStatus::UnknownId)), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Status);
        assert!(recorder.checks.lock().unwrap().is_empty());
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_client_ping() {
        let (recorder, url, handle) = recording_server(Recorder::default()).await;

        let app = new_app_client(&url, "client-id", "app-id", "0.0.0").unwrap();
        app.ping().await.unwrap();

        assert_eq!(recorder.pings.lock().unwrap().len(), 1);
        assert!(recorder.checks.lock().unwrap().is_empty());
        assert_well_formed(&recorder);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_client_event() {
        let (recorder, url, handle) = recording_server(Recorder::default()).await;

        let app = new_app_client(&url, "client-id", "app-id", "0.0.0").unwrap();
        let event = EventRequest::new(EventType::DOWNLOAD_COMPLETE, EventResult::SUCCESS);
        app.event(event.clone()).await.unwrap().unwrap();

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], event);
        assert_well_formed(&recorder);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_request_identity() {
        let (recorder, url, handle) = recording_server(Recorder::default()).await;

        let mut client = Client::new(&url, "client-id").unwrap();
        client.set_client_version("update_engine-0.4.0");
        let app = client.new_app_client("app-id", "1.0.0").unwrap();
        app.set_track("stable").unwrap();
        app.set_oem("ec3000");
        app.ping().await.unwrap();

        let requests = recorder.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.version.as_deref(), Some("update_engine-0.4.0"));
        assert_eq!(req.user_id.as_deref(), Some("client-id"));
        assert_eq!(req.session_id.as_deref(), Some(client.session_id()));
        assert!(!req.is_machine);

        let app_req = &req.apps[0];
        assert_eq!(app_req.id, "app-id");
        assert_eq!(app_req.track.as_deref(), Some("stable"));
        assert_eq!(app_req.oem.as_deref(), Some("ec3000"));
        assert_well_formed(&recorder);
        handle.shutdown();
    }

    /// Serve `/v1/update/` with an ok app entry shaped further by `answer`.
    async fn scripted_server(answer: fn(&mut AppResponse)) -> String {
        use axum::{response::IntoResponse, routing::post, Router};

        let handler = move |body: axum::body::Bytes| async move {
            let req = omaha::decode_request("", &body).unwrap();
            let mut resp = omaha::Response::new();
            answer(resp.add_app(req.apps[0].id.clone(), AppStatus::Ok));
            (
                [(axum::http::header::CONTENT_TYPE, omaha::XML_CONTENT_TYPE)],
                omaha::encode_response(&resp).unwrap(),
            )
                .into_response()
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/v1/update/", post(handler))).await
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_server_without_ping_ack() {
        let url = scripted_server(|_| {}).await;

        let app = new_app_client(&url, "client-id", "app-id", "1.0.0").unwrap();
        let err = app.update_check().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolInvalid);
        assert_eq!(err.exit_code().0, 34);

        let err = app.ping().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolInvalid);
    }

    #[tokio::test]
    async fn test_server_without_update_check() {
        let url = scripted_server(|app| {
            app.add_ping();
        })
        .await;

        let app = new_app_client(&url, "client-id", "app-id", "1.0.0").unwrap();
        let err = app.update_check().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolInvalid);
    }

    #[tokio::test]
    async fn test_ping_not_acknowledged() {
        let url = scripted_server(|app| {
            app.add_ping().status = "error-busy".into();
            app.add_update_check(UpdateStatus::NoUpdate);
        })
        .await;

        let app = new_app_client(&url, "client-id", "app-id", "1.0.0").unwrap();
        let err = app.ping().await.unwrap_err();
        assert!(matches!(&err, OmahaError::PingStatus(s) if s == "error-busy"), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Status);

        let err = app.update_check().await.unwrap_err();
        assert!(matches!(err, OmahaError::PingStatus(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_app_without_status_rejected() {
        let url = scripted_server(|app| {
            app.status = AppStatus::default();
            app.add_ping();
        })
        .await;

        let app = new_app_client(&url, "client-id", "app-id", "1.0.0").unwrap();
        let err = app.ping().await.unwrap_err();
        assert!(matches!(&err, OmahaError::AppStatus(s) if !s.is_ok()), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Status);
    }

    #[tokio::test]
    async fn test_event_without_ack() {
        let url = scripted_server(|_| {}).await;

        let app = new_app_client(&url, "client-id", "app-id", "1.0.0").unwrap();
        let event = EventRequest::new(EventType::UPDATE_COMPLETE, EventResult::SUCCESS_REBOOT);
        let err = app.event(event).await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolInvalid);
        assert_eq!(err.exit_code().0, 34);
    }

    #[tokio::test]
    async fn test_event_not_acknowledged() {
        let url = scripted_server(|app| {
            app.add_event().status = "error-invalid".into();
        })
        .await;

        let app = new_app_client(&url, "client-id", "app-id", "1.0.0").unwrap();
        let event = EventRequest::new(EventType::UPDATE_COMPLETE, EventResult::SUCCESS_REBOOT);
        let err = app.event(event).await.unwrap().unwrap_err();
        assert!(matches!(&err, OmahaError::EventStatus(s) if s == "error-invalid"), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Status);
    }

    #[test]
    fn test_config_errors() {
        assert!(Client::new("http://localhost", "").is_err());
        assert!(Client::new("ftp://localhost", "id").is_err());
        assert!(Client::new("http://", "id").is_err());
        assert!(Client::new("not a url", "id").is_err());

        let mut client = Client::new("http://localhost", "id").unwrap();
        assert!(client.new_app_client("app", "").is_err());
        let app = client.new_app_client("app", "1.0.0").unwrap();
        let err = client.new_app_client("app", "2.0.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        assert!(app.set_version("").is_err());
        assert!(app.set_track("").is_err());
        assert_eq!(app.version(), "1.0.0");
        assert_eq!(app.track(), None);
    }

    #[test]
    fn test_server_url_normalization() {
        let client = Client::new("http://localhost:8000", "id").unwrap();
        assert_eq!(client.server_url(), "http://localhost:8000/v1/update/");

        client.set_server_url("https://example.com/").unwrap();
        assert_eq!(client.server_url(), "https://example.com/v1/update/");

        client.set_server_url("https://example.com/custom").unwrap();
        assert_eq!(client.server_url(), "https://example.com/custom");

        assert!(client.set_server_url("example.com").is_err());
        assert_eq!(client.server_url(), "https://example.com/custom");
    }

    #[test]
    fn test_session_identity() {
        let a = Client::new("http://localhost", "id").unwrap();
        let b = Client::new("http://localhost", "id").unwrap();
        assert_eq!(a.session_id().len(), 36);
        assert_ne!(a.session_id(), b.session_id());
        assert_eq!(a.client_version(), "omaha-client");
        assert!(!a.is_machine());
    }

    #[test]
    fn test_new_request_mirrors_identity() {
        let mut client = Client::new("http://localhost", "client-id").unwrap();
        let app = client.new_app_client("app-id", "1.0.0").unwrap();

        let req = app.new_request();
        assert_eq!(req.protocol, "3.0");
        assert!(req.os.is_some());
        assert_eq!(req.apps.len(), 1);
        assert_eq!(req.apps[0].machine_id, req.user_id);
        assert_eq!(req.apps[0].boot_id, req.session_id);
        assert!(req.apps[0].ping.is_none());
        assert!(req.apps[0].update_check.is_none());
    }

    #[test]
    fn test_machine_client() {
        let identity = MachineIdentity::from_parts(
            "0123456789abcdef0123456789abcdef",
            "7d52a1cc-7066-40f0-91c7-7cb6a871bfde",
        )
        .unwrap();
        let mut client =
            Client::with_machine_identity("http://localhost", &identity, ClientConfig::default())
                .unwrap();
        assert!(client.is_machine());
        assert_eq!(client.user_id(), identity.machine_id());
        assert_eq!(client.session_id(), identity.boot_id());

        let req = client.new_app_client("app", "1.0.0").unwrap().new_request();
        assert!(req.is_machine);
    }

    #[test]
    fn test_set_app_id() {
        let mut client = Client::new("http://localhost", "id").unwrap();
        let app = client.new_app_client("old", "1.0.0").unwrap();
        client.new_app_client("taken", "1.0.0").unwrap();

        assert!(client.set_app_id("old", "taken").is_err());
        assert!(client.set_app_id("missing", "new").is_err());
        client.set_app_id("old", "old").unwrap();

        client.set_app_id("old", "new").unwrap();
        assert!(client.app_client("old").is_none());
        assert_eq!(client.app_client("new").unwrap().app_id(), "new");
        assert_eq!(app.app_id(), "new");
        assert_eq!(app.new_request().apps[0].id, "new");

        // The old id is free again.
        client.new_app_client("old", "2.0.0").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_ping_schedule() {
        let client = Client::new("http://localhost", "id").unwrap();

        let start = tokio::time::Instant::now();
        client.next_ping().await;
        let first = start.elapsed();
        assert!(first >= Duration::from_secs(2 * 60), "{first:?}");
        assert!(first <= Duration::from_secs(12 * 60), "{first:?}");

        // Set by any ping or update check, even one that fails.
        client.session.sent_ping.store(true, Ordering::SeqCst);

        let start = tokio::time::Instant::now();
        client.next_ping().await;
        let later = start.elapsed();
        assert!(later >= Duration::from_secs(40 * 60), "{later:?}");
        assert!(later <= Duration::from_secs(50 * 60), "{later:?}");
    }
}

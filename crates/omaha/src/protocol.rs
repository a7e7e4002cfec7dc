//! Omaha wire model.
//!
//! Plain data records for requests and responses with their XML mappings.
//! Attributes use the `@name` convention of `quick-xml`'s serde support;
//! optional attributes are omitted when unset so encoded documents stay
//! byte-compatible with other Omaha implementations.

use serde::{Deserialize, Serialize};

use crate::codes::{AppStatus, EventResult, EventType, UpdateStatus};

/// The only protocol version this crate speaks.
pub const PROTOCOL_VERSION: &str = "3.0";

/// Value of the `server` attribute on responses built by [`Response::new`].
pub const SERVER_NAME: &str = "omaha-rs";

/// Status string used by ping and event acknowledgements.
pub const STATUS_OK: &str = "ok";

/// Serde glue for `<outer><item/><item/></outer>` lists, which flatten to a
/// plain `Vec` in the model.
macro_rules! xml_list {
    ($module:ident, $item:ty, $tag:literal) => {
        mod $module {
            use serde::{Deserialize, Deserializer, Serialize, Serializer};

            #[derive(Serialize)]
            struct Borrowed<'a> {
                #[serde(rename = $tag)]
                items: &'a [$item],
            }

            #[derive(Deserialize)]
            struct Owned {
                #[serde(rename = $tag, default)]
                items: Vec<$item>,
            }

            pub fn serialize<S: Serializer>(items: &[$item], s: S) -> Result<S::Ok, S::Error> {
                Borrowed { items }.serialize(s)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<$item>, D::Error> {
                Owned::deserialize(d).map(|owned| owned.items)
            }
        }
    };
}

xml_list!(url_list, super::Url, "url");
xml_list!(package_list, super::Package, "package");
xml_list!(action_list, super::Action, "action");

/// `ismachine` is sent as `1`; absence means false.
mod int_bool {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "1" } else { "0" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.trim() {
            "1" | "true" => Ok(true),
            "" | "0" | "false" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean {other:?}"))),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Client request, the `<request>` document root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "request")]
pub struct Request {
    #[serde(rename = "@protocol", default)]
    pub protocol: String,
    /// Identity of the updater sending the request, e.g. `update_engine-0.4.0`.
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "@updaterversion", default, skip_serializing_if = "Option::is_none")]
    pub updater_version: Option<String>,
    #[serde(
        rename = "@ismachine",
        with = "int_bool",
        default,
        skip_serializing_if = "is_false"
    )]
    pub is_machine: bool,
    #[serde(rename = "@sessionid", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "@userid", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "@installsource", default, skip_serializing_if = "Option::is_none")]
    pub install_source: Option<String>,
    #[serde(rename = "@testsource", default, skip_serializing_if = "Option::is_none")]
    pub test_source: Option<String>,
    #[serde(rename = "@requestid", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(rename = "os", default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    #[serde(rename = "app", default)]
    pub apps: Vec<AppRequest>,
}

impl Request {
    /// Create a protocol 3.0 request describing the local operating system.
    pub fn new() -> Self {
        Self {
            protocol: PROTOCOL_VERSION.to_string(),
            os: Some(Os::local()),
            ..Default::default()
        }
    }

    /// Append an application entry and return it for further setup.
    pub fn add_app(&mut self, id: impl Into<String>, version: impl Into<String>) -> &mut AppRequest {
        self.apps.push(AppRequest {
            id: id.into(),
            version: Some(version.into()),
            ..Default::default()
        });
        let last = self.apps.len() - 1;
        &mut self.apps[last]
    }

    pub fn app(&self, id: &str) -> Option<&AppRequest> {
        self.apps.iter().find(|app| app.id == id)
    }
}

/// Operating system description, `<os>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Os {
    #[serde(rename = "@platform", default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "@sp", default, skip_serializing_if = "Option::is_none")]
    pub service_pack: Option<String>,
    #[serde(rename = "@arch", default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl Os {
    /// Platform and architecture of the running host, in Omaha spelling.
    pub fn local() -> Self {
        Self {
            platform: Some(local_platform().to_string()),
            arch: Some(local_arch().to_string()),
            ..Default::default()
        }
    }
}

fn local_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "mac",
        "windows" => "win",
        other => other,
    }
}

fn local_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Application entry of a request, `<app>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppRequest {
    #[serde(rename = "@appid")]
    pub id: String,
    #[serde(rename = "@version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "@nextversion", default, skip_serializing_if = "Option::is_none")]
    pub next_version: Option<String>,
    #[serde(rename = "@lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(rename = "@client", default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(rename = "@installage", default, skip_serializing_if = "Option::is_none")]
    pub install_age: Option<String>,

    // Update engine extensions.
    #[serde(rename = "@track", default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(rename = "@from_track", default, skip_serializing_if = "Option::is_none")]
    pub from_track: Option<String>,
    #[serde(rename = "@board", default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(rename = "@delta_okay", default, skip_serializing_if = "is_false")]
    pub delta_ok: bool,
    #[serde(rename = "@oem", default, skip_serializing_if = "Option::is_none")]
    pub oem: Option<String>,
    #[serde(rename = "@oemversion", default, skip_serializing_if = "Option::is_none")]
    pub oem_version: Option<String>,
    #[serde(rename = "@alephversion", default, skip_serializing_if = "Option::is_none")]
    pub aleph_version: Option<String>,
    /// Mirrors the request's user id.
    #[serde(rename = "@machineid", default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    /// Mirrors the request's session id.
    #[serde(rename = "@bootid", default, skip_serializing_if = "Option::is_none")]
    pub boot_id: Option<String>,

    #[serde(rename = "ping", default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<PingRequest>,
    #[serde(rename = "updatecheck", default, skip_serializing_if = "Option::is_none")]
    pub update_check: Option<UpdateRequest>,
    #[serde(rename = "event", default)]
    pub events: Vec<EventRequest>,
}

impl AppRequest {
    pub fn add_ping(&mut self) -> &mut PingRequest {
        self.ping.get_or_insert_with(PingRequest::default)
    }

    pub fn add_update_check(&mut self) -> &mut UpdateRequest {
        self.update_check.get_or_insert_with(UpdateRequest::default)
    }

    pub fn add_event(&mut self, event: EventRequest) {
        self.events.push(event);
    }
}

/// Ping marker, `<ping>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {
    #[serde(rename = "@active", default, skip_serializing_if = "Option::is_none")]
    pub active: Option<i32>,
    #[serde(rename = "@a", default, skip_serializing_if = "Option::is_none")]
    pub last_active_days: Option<i32>,
    #[serde(rename = "@r", default, skip_serializing_if = "Option::is_none")]
    pub last_report_days: Option<i32>,
    #[serde(rename = "@ad", default, skip_serializing_if = "Option::is_none")]
    pub active_day: Option<i32>,
    #[serde(rename = "@rd", default, skip_serializing_if = "Option::is_none")]
    pub report_day: Option<i32>,
}

/// Update check marker, `<updatecheck>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(
        rename = "@targetversionprefix",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_version_prefix: Option<String>,
}

/// Install progress report, `<event>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    #[serde(rename = "@eventtype")]
    pub event_type: EventType,
    #[serde(rename = "@eventresult")]
    pub result: EventResult,
    #[serde(rename = "@previousversion", default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// Zero means "no error code" and is not sent.
    #[serde(rename = "@errorcode", default, skip_serializing_if = "is_zero")]
    pub error_code: i32,
}

impl EventRequest {
    pub fn new(event_type: EventType, result: EventResult) -> Self {
        Self {
            event_type,
            result,
            ..Default::default()
        }
    }
}

/// Server response, the `<response>` document root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "response")]
pub struct Response {
    #[serde(rename = "@protocol", default)]
    pub protocol: String,
    #[serde(rename = "@server", default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(rename = "daystart", default, skip_serializing_if = "Option::is_none")]
    pub day_start: Option<DayStart>,
    #[serde(rename = "app", default)]
    pub apps: Vec<AppResponse>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            protocol: PROTOCOL_VERSION.to_string(),
            server: Some(SERVER_NAME.to_string()),
            day_start: Some(DayStart { elapsed_seconds: 0 }),
            apps: Vec::new(),
        }
    }

    pub fn add_app(&mut self, id: impl Into<String>, status: AppStatus) -> &mut AppResponse {
        self.apps.push(AppResponse {
            id: id.into(),
            status,
            ..Default::default()
        });
        let last = self.apps.len() - 1;
        &mut self.apps[last]
    }

    pub fn app(&self, id: &str) -> Option<&AppResponse> {
        self.apps.iter().find(|app| app.id == id)
    }
}

/// `<daystart>`: seconds elapsed since midnight on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStart {
    #[serde(rename = "@elapsed_seconds", default)]
    pub elapsed_seconds: u64,
}

/// Application entry of a response, `<app>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppResponse {
    #[serde(rename = "@appid")]
    pub id: String,
    #[serde(rename = "@status", default)]
    pub status: AppStatus,
    #[serde(rename = "ping", default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<PingResponse>,
    #[serde(rename = "updatecheck", default, skip_serializing_if = "Option::is_none")]
    pub update_check: Option<UpdateResponse>,
    #[serde(rename = "event", default)]
    pub events: Vec<EventResponse>,
}

impl AppResponse {
    pub fn add_ping(&mut self) -> &mut PingResponse {
        self.ping.insert(PingResponse {
            status: STATUS_OK.to_string(),
        })
    }

    pub fn add_update_check(&mut self, status: UpdateStatus) -> &mut UpdateResponse {
        self.update_check.insert(UpdateResponse {
            status,
            ..Default::default()
        })
    }

    pub fn add_event(&mut self) -> &mut EventResponse {
        self.events.push(EventResponse {
            status: STATUS_OK.to_string(),
        });
        let last = self.events.len() - 1;
        &mut self.events[last]
    }
}

/// Ping acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(rename = "@status")]
    pub status: String,
}

/// Event acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    #[serde(rename = "@status")]
    pub status: String,
}

/// Update check answer. Carries URLs and a manifest when `status` is ok.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    #[serde(rename = "@status")]
    pub status: UpdateStatus,
    #[serde(
        rename = "urls",
        with = "url_list",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub urls: Vec<Url>,
    #[serde(rename = "manifest", default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,
}

impl UpdateResponse {
    pub fn add_url(&mut self, codebase: impl Into<String>) {
        self.urls.push(Url {
            codebase: codebase.into(),
        });
    }

    pub fn add_manifest(&mut self, version: impl Into<String>) -> &mut Manifest {
        self.manifest.insert(Manifest {
            version: version.into(),
            ..Default::default()
        })
    }
}

/// Base URL packages are downloaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    #[serde(rename = "@codebase")]
    pub codebase: String,
}

/// Description of an available update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(
        rename = "packages",
        with = "package_list",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub packages: Vec<Package>,
    #[serde(
        rename = "actions",
        with = "action_list",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub actions: Vec<Action>,
}

impl Manifest {
    pub fn add_package(&mut self, package: Package) {
        self.packages.push(package);
    }

    pub fn add_action(&mut self, event: impl Into<String>) -> &mut Action {
        self.actions.push(Action {
            event: event.into(),
            ..Default::default()
        });
        let last = self.actions.len() - 1;
        &mut self.actions[last]
    }
}

/// Downloadable file belonging to an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "@name")]
    pub name: String,
    /// Base64 SHA-1 digest.
    #[serde(rename = "@hash", default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    /// Base64 SHA-256 digest.
    #[serde(rename = "@sha256", default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(rename = "@size", default)]
    pub size: u64,
    #[serde(rename = "@required", default)]
    pub required: bool,
}

/// Post-install action attached to an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Trigger name, e.g. `postinstall`.
    #[serde(rename = "@event")]
    pub event: String,
    #[serde(rename = "@DisplayVersion", default, skip_serializing_if = "Option::is_none")]
    pub display_version: Option<String>,
    #[serde(rename = "@sha256", default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(rename = "@needsadmin", default)]
    pub needs_admin: bool,
    #[serde(rename = "@IsDelta", default)]
    pub is_delta: bool,
    #[serde(rename = "@DisablePayloadBackoff", default)]
    pub disable_payload_backoff: bool,
    #[serde(
        rename = "@MetadataSignatureRsa",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata_signature_rsa: Option<String>,
    #[serde(rename = "@MetadataSize", default, skip_serializing_if = "Option::is_none")]
    pub metadata_size: Option<String>,
    #[serde(rename = "@deadline", default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

//! Status values and event codes used on the wire.
//!
//! App and update-check statuses are strings in the protocol. Well-known
//! values get their own variant; anything else is preserved verbatim in
//! `Other` so a response can always be decoded and re-encoded unchanged.
//!
//! Event types and results are numeric. They are modelled as newtypes with
//! named constants so codes unknown to this crate still round-trip.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of an application entry in a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppStatus {
    /// The application is known and the request was processed.
    Ok,
    /// The application is restricted for this client.
    Restricted,
    /// The server does not know this application id.
    UnknownId,
    /// The application id is not well formed.
    InvalidId,
    /// The server failed while processing this application.
    InternalError,
    /// Any status this crate does not know about.
    Other(String),
}

impl AppStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::Restricted => "restricted",
            Self::UnknownId => "error-unknownApplication",
            Self::InvalidId => "error-invalidAppId",
            Self::InternalError => "error-internal",
            Self::Other(s) => s,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// An absent status is empty, which is never ok.
impl Default for AppStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for AppStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ok" => Self::Ok,
            "restricted" => Self::Restricted,
            "error-unknownApplication" => Self::UnknownId,
            "error-invalidAppId" => Self::InvalidId,
            "error-internal" => Self::InternalError,
            _ => Self::Other(s),
        }
    }
}

impl From<AppStatus> for String {
    fn from(status: AppStatus) -> Self {
        match status {
            AppStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app status {}", self.as_str())
    }
}

/// Status of an update check in a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UpdateStatus {
    /// An update is available; the response carries a manifest.
    Ok,
    /// The client is already up to date.
    NoUpdate,
    OsNotSupported,
    UnsupportedProtocol,
    PluginRestrictedHost,
    HashMismatch,
    InternalError,
    /// Any status this crate does not know about.
    Other(String),
}

impl UpdateStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::NoUpdate => "noupdate",
            Self::OsNotSupported => "error-osnotsupported",
            Self::UnsupportedProtocol => "error-unsupportedProtocol",
            Self::PluginRestrictedHost => "error-pluginRestrictedHost",
            Self::HashMismatch => "error-hash",
            Self::InternalError => "error-internal",
            Self::Other(s) => s,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl Default for UpdateStatus {
    fn default() -> Self {
        Self::NoUpdate
    }
}

impl From<String> for UpdateStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ok" => Self::Ok,
            "noupdate" => Self::NoUpdate,
            "error-osnotsupported" => Self::OsNotSupported,
            "error-unsupportedProtocol" => Self::UnsupportedProtocol,
            "error-pluginRestrictedHost" => Self::PluginRestrictedHost,
            "error-hash" => Self::HashMismatch,
            "error-internal" => Self::InternalError,
            _ => Self::Other(s),
        }
    }
}

impl From<UpdateStatus> for String {
    fn from(status: UpdateStatus) -> Self {
        match status {
            UpdateStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update status {}", self.as_str())
    }
}

/// Kind of step an [`EventRequest`](crate::EventRequest) reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(pub i32);

impl EventType {
    pub const UNKNOWN: Self = Self(0);
    pub const DOWNLOAD_COMPLETE: Self = Self(1);
    pub const INSTALL_COMPLETE: Self = Self(2);
    pub const UPDATE_COMPLETE: Self = Self(3);
    pub const UNINSTALL: Self = Self(4);
    pub const DOWNLOAD_STARTED: Self = Self(5);
    pub const INSTALL_STARTED: Self = Self(6);
    pub const NEW_APPLICATION_INSTALL_STARTED: Self = Self(9);
    pub const SETUP_STARTED: Self = Self(10);
    pub const SETUP_FINISHED: Self = Self(11);
    pub const UPDATE_APPLICATION_STARTED: Self = Self(12);
    pub const UPDATE_DOWNLOAD_STARTED: Self = Self(13);
    pub const UPDATE_DOWNLOAD_FINISHED: Self = Self(14);
    pub const UPDATE_INSTALLER_STARTED: Self = Self(15);
    pub const SETUP_UPDATE_BEGIN: Self = Self(16);
    pub const SETUP_UPDATE_COMPLETE: Self = Self(17);
    pub const REGISTER_PRODUCT_COMPLETE: Self = Self(20);
    pub const OEM_INSTALL_FIRST_CHECK: Self = Self(30);
    pub const APP_SPECIFIC_COMMAND_STARTED: Self = Self(40);
    pub const APP_SPECIFIC_COMMAND_ENDED: Self = Self(41);
    pub const SETUP_FAILURE: Self = Self(100);
    pub const COM_SERVER_FAILURE: Self = Self(102);
    pub const SETUP_UPDATE_FAILURE: Self = Self(103);

    /// Human readable name, if the code is a known one.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "unknown",
            1 => "download complete",
            2 => "install complete",
            3 => "update complete",
            4 => "uninstall",
            5 => "download started",
            6 => "install started",
            9 => "new application install started",
            10 => "setup started",
            11 => "setup finished",
            12 => "update application started",
            13 => "update download started",
            14 => "update download finished",
            15 => "update installer started",
            16 => "setup update begin",
            17 => "setup update complete",
            20 => "register product complete",
            30 => "OEM install first check",
            40 => "app-specific command started",
            41 => "app-specific command ended",
            100 => "setup failure",
            102 => "COM server failure",
            103 => "setup update failure",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "event {}", self.0),
        }
    }
}

/// Outcome of the step an [`EventRequest`](crate::EventRequest) reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventResult(pub i32);

impl EventResult {
    pub const ERROR: Self = Self(0);
    pub const SUCCESS: Self = Self(1);
    pub const SUCCESS_REBOOT: Self = Self(2);
    pub const SUCCESS_RESTART_BROWSER: Self = Self(3);
    pub const CANCELLED: Self = Self(4);
    pub const ERROR_INSTALLER_MSI: Self = Self(5);
    pub const ERROR_INSTALLER_OTHER: Self = Self(6);
    pub const NO_UPDATE: Self = Self(7);
    pub const ERROR_INSTALLER_SYSTEM: Self = Self(8);
    pub const UPDATE_DEFERRED: Self = Self(9);
    pub const HANDOFF_ERROR: Self = Self(10);

    /// Human readable name, if the code is a known one.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "error",
            1 => "success",
            2 => "success reboot",
            3 => "success restart browser",
            4 => "cancelled",
            5 => "error installer MSI",
            6 => "error installer other",
            7 => "noupdate",
            8 => "error installer system",
            9 => "update deferred",
            10 => "handoff error",
            _ => return None,
        };
        Some(name)
    }

    pub fn is_error(self) -> bool {
        matches!(self.0, 0 | 5 | 6 | 8 | 10)
    }
}

impl fmt::Display for EventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "result {}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_status_strings() {
        assert_eq!(AppStatus::from("ok".to_string()), AppStatus::Ok);
        assert_eq!(
            AppStatus::from("error-unknownApplication".to_string()),
            AppStatus::UnknownId
        );
        assert_eq!(
            AppStatus::from("error-weird".to_string()),
            AppStatus::Other("error-weird".to_string())
        );
        assert_eq!(String::from(AppStatus::InvalidId), "error-invalidAppId");
        assert_eq!(String::from(AppStatus::Other("x".into())), "x");
    }

    #[test]
    fn test_update_status_display() {
        assert_eq!(UpdateStatus::NoUpdate.to_string(), "update status noupdate");
        assert_eq!(UpdateStatus::from("noupdate".to_string()), UpdateStatus::NoUpdate);
        assert!(UpdateStatus::Ok.is_ok());
        assert!(!UpdateStatus::HashMismatch.is_ok());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventType::UPDATE_COMPLETE.to_string(), "update complete");
        assert_eq!(EventType(7).to_string(), "event 7");
        assert_eq!(EventResult::SUCCESS_REBOOT.to_string(), "success reboot");
        assert!(EventResult::ERROR.is_error());
        assert!(!EventResult::SUCCESS.is_error());
    }
}

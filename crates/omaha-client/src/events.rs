//! Diagnostic exit codes and the events update_engine reports.
//!
//! Exit codes follow the update_engine 0.4 table. Most of them describe
//! install steps this crate never performs; they exist so hosts can report
//! their own failures with the same numbering. HTTP failures are encoded as
//! `2000 + status`.

use std::fmt;

use omaha::{EventRequest, EventResult, EventType};

/// Numeric failure code carried in an event's `errorcode` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: Self = Self(0);
    pub const ERROR: Self = Self(1);
    pub const OMAHA_REQUEST_ERROR: Self = Self(2);
    pub const OMAHA_RESPONSE_HANDLER_ERROR: Self = Self(3);
    pub const FILESYSTEM_COPIER_ERROR: Self = Self(4);
    pub const POSTINSTALL_RUNNER_ERROR: Self = Self(5);
    pub const SET_BOOTABLE_FLAG_ERROR: Self = Self(6);
    pub const INSTALL_DEVICE_OPEN_ERROR: Self = Self(7);
    pub const KERNEL_DEVICE_OPEN_ERROR: Self = Self(8);
    pub const DOWNLOAD_TRANSFER_ERROR: Self = Self(9);
    pub const PAYLOAD_HASH_MISMATCH_ERROR: Self = Self(10);
    pub const PAYLOAD_SIZE_MISMATCH_ERROR: Self = Self(11);
    pub const DOWNLOAD_PAYLOAD_VERIFICATION_ERROR: Self = Self(12);
    pub const DOWNLOAD_NEW_PARTITION_INFO_ERROR: Self = Self(13);
    pub const DOWNLOAD_WRITE_ERROR: Self = Self(14);
    pub const NEW_ROOTFS_VERIFICATION_ERROR: Self = Self(15);
    pub const NEW_KERNEL_VERIFICATION_ERROR: Self = Self(16);
    pub const SIGNED_DELTA_PAYLOAD_EXPECTED_ERROR: Self = Self(17);
    pub const DOWNLOAD_PAYLOAD_PUBKEY_VERIFICATION_ERROR: Self = Self(18);
    pub const POSTINSTALL_BOOTED_FROM_FIRMWARE_B: Self = Self(19);
    pub const DOWNLOAD_STATE_INITIALIZATION_ERROR: Self = Self(20);
    pub const DOWNLOAD_INVALID_METADATA_MAGIC_STRING: Self = Self(21);
    pub const DOWNLOAD_SIGNATURE_MISSING_IN_MANIFEST: Self = Self(22);
    pub const DOWNLOAD_MANIFEST_PARSE_ERROR: Self = Self(23);
    pub const DOWNLOAD_METADATA_SIGNATURE_ERROR: Self = Self(24);
    pub const DOWNLOAD_METADATA_SIGNATURE_VERIFICATION_ERROR: Self = Self(25);
    pub const DOWNLOAD_METADATA_SIGNATURE_MISMATCH: Self = Self(26);
    pub const DOWNLOAD_OPERATION_HASH_VERIFICATION_ERROR: Self = Self(27);
    pub const DOWNLOAD_OPERATION_EXECUTION_ERROR: Self = Self(28);
    pub const DOWNLOAD_OPERATION_HASH_MISMATCH: Self = Self(29);
    pub const OMAHA_REQUEST_EMPTY_RESPONSE_ERROR: Self = Self(30);
    pub const OMAHA_REQUEST_XML_PARSE_ERROR: Self = Self(31);
    pub const DOWNLOAD_INVALID_METADATA_SIZE: Self = Self(32);
    pub const DOWNLOAD_INVALID_METADATA_SIGNATURE: Self = Self(33);
    pub const OMAHA_RESPONSE_INVALID: Self = Self(34);
    pub const OMAHA_UPDATE_IGNORED_PER_POLICY: Self = Self(35);
    pub const OMAHA_UPDATE_DEFERRED_PER_POLICY: Self = Self(36);
    pub const OMAHA_ERROR_IN_HTTP_RESPONSE: Self = Self(37);
    pub const DOWNLOAD_OPERATION_HASH_MISSING_ERROR: Self = Self(38);
    pub const DOWNLOAD_METADATA_SIGNATURE_MISSING_ERROR: Self = Self(39);
    pub const OMAHA_UPDATE_DEFERRED_FOR_BACKOFF: Self = Self(40);
    pub const POSTINSTALL_POWERWASH_ERROR: Self = Self(41);
    pub const NEW_PCR_POLICY_VERIFICATION_ERROR: Self = Self(42);
    pub const NEW_PCR_POLICY_HTTP_ERROR: Self = Self(43);

    /// Base of the range encoding HTTP failures from the Omaha server.
    pub const OMAHA_REQUEST_HTTP_RESPONSE_BASE: Self = Self(2000);

    /// Code for an HTTP failure. Statuses outside `1..1000` collapse to a
    /// generic request error.
    pub fn from_http_status(status: u16) -> Self {
        if (1..1000).contains(&status) {
            Self(Self::OMAHA_REQUEST_HTTP_RESPONSE_BASE.0 + i32::from(status))
        } else {
            Self::OMAHA_REQUEST_ERROR
        }
    }

    /// Human readable name of a table entry.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "success",
            1 => "error",
            2 => "omaha request error",
            3 => "omaha response handler error",
            4 => "filesystem copier error",
            5 => "postinstall runner error",
            6 => "set bootable flag error",
            7 => "install device open error",
            8 => "kernel device open error",
            9 => "download transfer error",
            10 => "payload hash mismatch error",
            11 => "payload size mismatch error",
            12 => "download payload verification error",
            13 => "download new partition info error",
            14 => "download write error",
            15 => "new rootfs verification error",
            16 => "new kernel verification error",
            17 => "signed delta payload expected error",
            18 => "download payload pubkey verification error",
            19 => "postinstall booted from firmware B",
            20 => "download state initialization error",
            21 => "download invalid metadata magic string",
            22 => "download signature missing in manifest",
            23 => "download manifest parse error",
            24 => "download metadata signature error",
            25 => "download metadata signature verification error",
            26 => "download metadata signature mismatch",
            27 => "download operation hash verification error",
            28 => "download operation execution error",
            29 => "download operation hash mismatch",
            30 => "omaha request empty response error",
            31 => "omaha request XML parse error",
            32 => "download invalid metadata size",
            33 => "download invalid metadata signature",
            34 => "omaha response invalid",
            35 => "omaha update ignored per policy",
            36 => "omaha update deferred per policy",
            37 => "omaha error in HTTP response",
            38 => "download operation hash missing error",
            39 => "download metadata signature missing error",
            40 => "omaha update deferred for backoff",
            41 => "postinstall powerwash error",
            42 => "new PCR policy verification error",
            43 => "new PCR policy HTTP error",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        let base = Self::OMAHA_REQUEST_HTTP_RESPONSE_BASE.0;
        if self.0 > base {
            write!(f, "omaha response HTTP {} error", self.0 - base)
        } else {
            write!(f, "error code {}", self.0)
        }
    }
}

/// The update payload started downloading.
pub fn downloading() -> EventRequest {
    EventRequest::new(EventType::UPDATE_DOWNLOAD_STARTED, EventResult::SUCCESS)
}

/// The update payload finished downloading.
pub fn downloaded() -> EventRequest {
    EventRequest::new(EventType::UPDATE_DOWNLOAD_FINISHED, EventResult::SUCCESS)
}

/// The update was installed and awaits a reboot.
pub fn installed() -> EventRequest {
    EventRequest::new(EventType::UPDATE_COMPLETE, EventResult::SUCCESS)
}

/// The system rebooted into the update.
pub fn complete() -> EventRequest {
    EventRequest::new(EventType::UPDATE_COMPLETE, EventResult::SUCCESS_REBOOT)
}

/// Failure report. Always an error result with a non-zero code.
pub fn error_event(code: ExitCode) -> EventRequest {
    let code = if code.0 == 0 { ExitCode::ERROR } else { code };
    EventRequest {
        error_code: code.0,
        ..EventRequest::new(EventType::UPDATE_COMPLETE, EventResult::ERROR)
    }
}

/// One-line rendering of an event for logs.
pub fn describe_event(event: &EventRequest) -> String {
    let mut line = format!("omaha event: {}: {}", event.event_type, event.result);
    if event.error_code != 0 {
        let code = ExitCode(event.error_code);
        line.push_str(&format!(" ({} - {})", code.0, code));
    }
    line
}

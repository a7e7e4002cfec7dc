//! Error types for the Omaha client.
//!
//! Every failure carries a [`ErrorKind`] so callers can decide whether to
//! retry without matching on individual variants, and an [`ExitCode`] for
//! reporting the failure back to the server as an event.

use omaha::{AppStatus, CodecError, EventRequest};
use reqwest::StatusCode;
use thiserror::Error;

use crate::events::{error_event, ExitCode};

/// Coarse classification of an [`OmahaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The client was configured with invalid values.
    Config,
    /// The request timed out, locally or per the server's HTTP status.
    Timeout,
    /// A network or HTTP failure likely to clear up on retry.
    TemporaryTransport,
    /// A network or HTTP failure that retrying will not fix.
    PermanentTransport,
    /// The response could not be decoded.
    Codec,
    /// The response decoded but broke the protocol's expectations.
    ProtocolInvalid,
    /// The server answered with a non-ok status.
    Status,
}

/// A non-success HTTP status from the Omaha server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("http error: {status}")]
pub struct HttpError {
    status: StatusCode,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// True for 408 Request Timeout and 504 Gateway Timeout.
    pub fn timeout(&self) -> bool {
        matches!(
            self.status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT
        )
    }

    /// True for timeouts plus 429, 500, 502 and 503.
    pub fn temporary(&self) -> bool {
        self.timeout()
            || matches!(
                self.status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
            )
    }
}

/// Errors returned by the Omaha client.
#[derive(Debug, Error)]
pub enum OmahaError {
    /// Invalid client configuration or argument
    #[error("omaha: {0}")]
    Config(String),

    /// The request did not complete in time
    #[error("omaha: request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Network failure before a response was received
    #[error("omaha: request failed: {source}")]
    Network {
        temporary: bool,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success HTTP status
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response body could not be decoded
    #[error("omaha: {0}")]
    Codec(#[from] CodecError),

    /// The response is missing a section the request asked for
    #[error("omaha: invalid response: {0}")]
    ProtocolInvalid(String),

    /// The server rejected the application
    #[error("omaha: {0}")]
    AppStatus(AppStatus),

    /// The server did not acknowledge the ping
    #[error("omaha: ping status {0}")]
    PingStatus(String),

    /// The server did not acknowledge the event
    #[error("omaha: event status {0}")]
    EventStatus(String),
}

impl OmahaError {
    /// Classify a reqwest failure. Timeouts, connection failures and I/O
    /// errors while sending are worth retrying; anything else is not.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Network {
                temporary: err.is_connect() || (err.is_request() && caused_by_io(&err)),
                source: err,
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Network { temporary: true, .. } => ErrorKind::TemporaryTransport,
            Self::Network { temporary: false, .. } => ErrorKind::PermanentTransport,
            Self::Http(e) if e.timeout() => ErrorKind::Timeout,
            Self::Http(e) if e.temporary() => ErrorKind::TemporaryTransport,
            Self::Http(_) => ErrorKind::PermanentTransport,
            Self::Codec(_) => ErrorKind::Codec,
            Self::ProtocolInvalid(_) => ErrorKind::ProtocolInvalid,
            Self::AppStatus(_) | Self::PingStatus(_) | Self::EventStatus(_) => ErrorKind::Status,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Timeout | ErrorKind::TemporaryTransport
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// Diagnostic code for reporting this failure in an event.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Http(e) => ExitCode::from_http_status(e.status().as_u16()),
            Self::Codec(CodecError::EmptyBody) => ExitCode::OMAHA_REQUEST_EMPTY_RESPONSE_ERROR,
            Self::Codec(CodecError::TruncatedBody) => ExitCode::OMAHA_RESPONSE_INVALID,
            Self::Codec(CodecError::Encode(_)) => ExitCode::OMAHA_REQUEST_ERROR,
            Self::Codec(_) => ExitCode::OMAHA_REQUEST_XML_PARSE_ERROR,
            Self::ProtocolInvalid(_) => ExitCode::OMAHA_RESPONSE_INVALID,
            Self::Config(_)
            | Self::Timeout(_)
            | Self::Network { .. }
            | Self::AppStatus(_)
            | Self::PingStatus(_)
            | Self::EventStatus(_) => ExitCode::OMAHA_REQUEST_ERROR,
        }
    }

    /// Error event describing this failure.
    pub fn error_event(&self) -> EventRequest {
        error_event(self.exit_code())
    }
}

/// Whether an I/O error, such as a reset connection, is anywhere in the
/// source chain of `err`.
fn caused_by_io(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        source = cause.source();
    }
    false
}

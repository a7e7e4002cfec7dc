//! # omaha
//!
//! Implementation of the Omaha update protocol (version 3.0).
//!
//! Omaha is a request/response protocol carried over HTTP with XML bodies.
//! Clients send a `<request>` describing one or more applications, asking
//! for update checks, reporting pings, and narrating install events. The
//! server answers with a `<response>` holding per-application status and,
//! when an update is available, a download manifest.
//!
//! This crate handles:
//! - The wire model for requests and responses
//! - Encoding and decoding with content-type, size, and version checks
//! - The server-side [`Updater`] contract and its request dispatch
//! - An axum based HTTP [`Server`] and a single-package [`TrivialServer`]
//!
//! The client session and resilient transport live in `omaha-client`.

pub mod codec;
pub mod codes;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod trivial;

pub use codec::{
    check_content_type, decode_request, decode_response, encode_request, encode_response,
    MAX_BODY_SIZE, XML_CONTENT_TYPE,
};
pub use codes::{AppStatus, EventResult, EventType, UpdateStatus};
pub use error::CodecError;
pub use handler::{handle_request, Update, Updater, UpdaterStub};
pub use protocol::{
    Action, AppRequest, AppResponse, DayStart, EventRequest, EventResponse, Manifest, Os,
    Package, PingRequest, PingResponse, Request, Response, UpdateRequest, UpdateResponse, Url,
    PROTOCOL_VERSION,
};
pub use server::{omaha_router, Server, ShutdownHandle};
pub use trivial::{TrivialServer, TrivialUpdater};

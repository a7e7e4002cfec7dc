//! # omaha-client
//!
//! Client side of the Omaha update protocol.
//!
//! This crate handles:
//! - Session identity and per-application state ([`Client`], [`AppClient`])
//! - Update checks, pings, and install events
//! - HTTP transport with size limits and exponential backoff
//! - Randomized scheduling of periodic check-ins
//! - Diagnostic exit codes for reporting failures back to the server
//!
//! ```no_run
//! # async fn run() -> Result<(), omaha_client::OmahaError> {
//! let app = omaha_client::new_app_client(
//!     "https://updates.example.com",
//!     "client-id",
//!     "{app-id}",
//!     "1.0.0",
//! )?;
//! match app.update_check().await? {
//!     omaha_client::UpdateCheckResult::Available(update) => println!("{update:?}"),
//!     other => println!("{other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod fuzzy;
pub mod http;
pub mod machine;

pub use client::{new_app_client, AppClient, Client, UpdateCheckResult, DEFAULT_UPDATE_PATH};
pub use config::{ClientConfig, ConfigError, NetworkConfig, ScheduleConfig};
pub use error::{ErrorKind, HttpError, OmahaError};
pub use events::{describe_event, error_event, ExitCode};
pub use fuzzy::{fuzzy_after, fuzzy_duration, fuzzy_sleep, init_scheduler};
pub use http::{retry_with_backoff, HttpTransport};
pub use machine::MachineIdentity;

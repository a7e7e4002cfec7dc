//! HTTP transport for Omaha requests.
//!
//! Handles posting encoded requests, bounding and decoding response bodies,
//! and retrying temporary failures with exponential backoff.

use std::future::Future;
use std::time::Duration;

use omaha::{decode_response, encode_request, Request, Response, MAX_BODY_SIZE, XML_CONTENT_TYPE};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{HttpError, OmahaError};
use crate::fuzzy::fuzzy_sleep;

/// Run `op` up to `tries` times, sleeping a fuzzed `backoff` between
/// attempts and doubling it each time. Stops at the first success or the
/// first error that is not temporary.
pub async fn retry_with_backoff<T, F, Fut>(
    initial: Duration,
    tries: u32,
    mut op: F,
) -> Result<T, OmahaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OmahaError>>,
{
    let mut backoff = initial;
    let mut remaining = tries.max(1);
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        remaining -= 1;
        if remaining == 0 || !err.is_temporary() {
            return Err(err);
        }
        warn!(
            "Omaha request failed, retrying in ~{:?} ({} attempts left): {}",
            backoff, remaining, err
        );
        fuzzy_sleep(backoff, backoff).await;
        backoff = backoff.saturating_mul(2);
    }
}

/// Posts Omaha requests over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    backoff_initial: Duration,
    backoff_tries: u32,
}

impl HttpTransport {
    /// Create a transport with the default 90 second timeout and seven tries.
    pub fn new() -> Result<Self, OmahaError> {
        Self::with_config(&NetworkConfig::default())
    }

    pub fn with_config(config: &NetworkConfig) -> Result<Self, OmahaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("omaha-client/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OmahaError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            backoff_initial: config.backoff_initial(),
            backoff_tries: config.backoff_tries,
        })
    }

    /// Send one POST of an already encoded request and decode the answer.
    ///
    /// A non-success status is reported as [`HttpError`] regardless of the
    /// body.
    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<Response, OmahaError> {
        debug!("Posting omaha request to {}", url);

        let mut response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(OmahaError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::new(status).into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();

        // One byte past the ceiling is enough to tell a truncated body.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(OmahaError::from_reqwest)? {
            let room = MAX_BODY_SIZE + 1 - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() > MAX_BODY_SIZE {
                break;
            }
        }

        Ok(decode_response(&content_type, &body)?)
    }

    /// Encode `request` and post it, retrying temporary failures.
    pub async fn send(&self, url: &str, request: &Request) -> Result<Response, OmahaError> {
        let body = encode_request(request)?;
        retry_with_backoff(self.backoff_initial, self.backoff_tries, move || {
            self.post(url, body.clone())
        })
        .await
    }
}

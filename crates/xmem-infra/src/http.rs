//! Shared HTTP plumbing for the REST-backed adapters and connectors.
//!
//! Maps transport and status failures onto [`AdapterError`] so every backend
//! reports unreachability the same way.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use xmem_types::error::AdapterError;

/// Longest backend error body carried into an [`AdapterError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

/// Build a client with a per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AdapterError::InvalidConfig(format!("failed to build http client: {e}")))
}

/// Trim a trailing slash so paths can be appended with `format!`.
pub(crate) fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Map a transport failure.
pub(crate) fn send_error(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Unavailable(err.to_string())
    }
}

/// Pass 2xx responses through, turn everything else into `Rejected`.
pub(crate) async fn check(response: Response) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    Err(AdapterError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Like [`check`], but a 404 yields `None`.
pub(crate) async fn check_found(response: Response) -> Result<Option<Response>, AdapterError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    check(response).await.map(Some)
}

/// Decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AdapterError> {
    response
        .json::<T>()
        .await
        .map_err(|e| AdapterError::InvalidResponse(e.to_string()))
}

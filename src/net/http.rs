//! Shared `reqwest` plumbing.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

/// Upper bound on any single request, including each unseal submission.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the client used for every outbound call.
pub fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Why a response body could not be turned into `T`.
#[derive(Debug)]
pub enum BodyError {
    Transport(reqwest::Error),
    Decode(serde_json::Error),
}

/// Reads the whole body and decodes it as JSON.
///
/// Reading and decoding are kept apart so callers can tell a dropped
/// connection from a malformed payload.
pub async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BodyError> {
    let body = resp.bytes().await.map_err(BodyError::Transport)?;
    serde_json::from_slice(&body).map_err(BodyError::Decode)
}

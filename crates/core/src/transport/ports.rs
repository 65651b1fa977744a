//! Port interface for the pluggable network transport
//!
//! The core never opens sockets itself. Anything that can send an HTTP
//! request and hand back a status, headers and body (or a transport-level
//! failure) can drive the client.

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use signway_domain::{ApiError, TransportError};
use url::Url;

/// Fully resolved request handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportRequest {
    pub fn new(method: Method, url: Url, body: Vec<u8>) -> Self {
        Self { method, url, headers: HeaderMap::new(), body }
    }

    /// Absolute path plus query string, as covered by the request signature.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// Response returned by a transport, passed through unchanged on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the JSON body.
    ///
    /// 204/205 and empty bodies deserialize from `null`, so `()` and
    /// `Option<T>` targets work for bodiless responses.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if self.body.is_empty()
            || self.status == StatusCode::NO_CONTENT
            || self.status == StatusCode::RESET_CONTENT
        {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Decode(format!(
                    "empty response ({}) cannot be deserialized into the requested type",
                    self.status.as_u16()
                ))
            });
        }

        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::Decode(format!("Failed to parse response: {e}")))
    }
}

/// Trait for sending HTTP requests
///
/// Implementations must be safe to share across concurrent requests.
/// Cancelling a `send` future must have no side effects beyond the transport
/// itself.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response or a connectivity
    /// failure. Non-2xx statuses are responses, not errors.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

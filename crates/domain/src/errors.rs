//! Error types used throughout the client
//!
//! Every failed call surfaces exactly one [`ApiError`]. Local failures
//! (key resolution, signing) are never retried; client errors are the
//! caller's to correct; server and transport errors may be resubmitted.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key material could not be turned into a usable private key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyResolutionError {
    #[error("Invalid RSA private key: {0}")]
    InvalidRsaKey(String),

    #[error("Invalid Ed25519 seed: {0}")]
    InvalidSeed(String),
}

/// Token signing failed; always a local bug, never retried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error(transparent)]
    Key(#[from] KeyResolutionError),

    #[error("Signature primitive rejected input: {0}")]
    Primitive(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Coarse classification of a connectivity-layer failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    ConnectionReset,
    ConnectionRefused,
    Timeout,
    Dns,
    Tls,
    Other,
}

impl TransportErrorKind {
    /// Whether this failure says the endpoint itself is degraded rather than
    /// the request.
    pub const fn is_host_unreachable(self) -> bool {
        matches!(self, Self::ConnectionReset | Self::Timeout | Self::Dns | Self::Tls)
    }

    /// Stable label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionReset => "connection_reset",
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout => "timeout",
            Self::Dns => "dns",
            Self::Tls => "tls",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectivity-layer failure reported by a transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transport error ({kind}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn dns(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Dns, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub const fn is_host_unreachable(&self) -> bool {
        self.kind.is_host_unreachable()
    }
}

/// Structured error payload returned by the remote API, when it sends one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    /// Parse a JSON error object. Numeric codes are kept as their decimal
    /// text. Returns `None` for non-JSON bodies or objects without either
    /// field.
    pub fn parse(body: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        let object = value.as_object()?;

        let code = ["code", "error_code"].iter().find_map(|key| match object.get(*key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        let message = ["message", "msg", "error"]
            .iter()
            .find_map(|key| object.get(*key)?.as_str().map(str::to_string));

        if code.is_none() && message.is_none() {
            return None;
        }
        Some(Self { code, message })
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "[{code}] {message}"),
            (Some(code), None) => write!(f, "[{code}]"),
            (None, Some(message)) => f.write_str(message),
            (None, None) => Ok(()),
        }
    }
}

fn describe_body(body: &Option<ErrorBody>) -> String {
    body.as_ref().map(|b| format!(": {b}")).unwrap_or_default()
}

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Bad key material or signing failure - fatal, fix the credential
    Local,
    /// 4xx - caller-correctable request problem
    Client,
    /// 5xx - remote-side failure
    Server,
    /// Connectivity failure
    Transport,
    /// Invalid configuration or request construction
    Config,
}

/// Errors surfaced to callers of the client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Key resolution failed: {0}")]
    KeyResolution(KeyResolutionError),

    #[error("Signing failed: {0}")]
    Signing(SigningError),

    #[error("Client error: HTTP {code}{}", describe_body(.body))]
    ClientError { code: u16, body: Option<ErrorBody> },

    #[error("Server error: HTTP {code}{}", describe_body(.body))]
    ServerError { code: u16, body: Option<ErrorBody> },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<SigningError> for ApiError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::Key(key) => Self::KeyResolution(key),
            other => Self::Signing(other),
        }
    }
}

impl From<KeyResolutionError> for ApiError {
    fn from(err: KeyResolutionError) -> Self {
        Self::KeyResolution(err)
    }
}

impl ApiError {
    pub const fn client(code: u16) -> Self {
        Self::ClientError { code, body: None }
    }

    pub const fn server(code: u16) -> Self {
        Self::ServerError { code, body: None }
    }

    /// Get the error category for this error
    pub const fn category(&self) -> ApiErrorCategory {
        match self {
            Self::KeyResolution(_) | Self::Signing(_) => ApiErrorCategory::Local,
            Self::ClientError { .. } => ApiErrorCategory::Client,
            Self::ServerError { .. } => ApiErrorCategory::Server,
            Self::Transport(_) => ApiErrorCategory::Transport,
            Self::Config(_) | Self::InvalidRequest(_) | Self::Decode(_) => {
                ApiErrorCategory::Config
            }
        }
    }

    /// HTTP status carried by client/server errors.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ClientError { code, .. } | Self::ServerError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether resubmitting the same call may succeed. The client itself
    /// never resubmits.
    pub const fn is_retryable(&self) -> bool {
        matches!(self.category(), ApiErrorCategory::Server | ApiErrorCategory::Transport)
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

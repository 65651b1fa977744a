//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! client.

// Token signing
pub const DEFAULT_TOKEN_HORIZON_SECS: u64 = 30;
pub const TOKEN_TYPE: &str = "JWT";
pub const BEARER_PREFIX: &str = "Bearer ";

// Transport policy defaults (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 15;

// Standard headers
pub const DEFAULT_USER_AGENT: &str = concat!("signway/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_LOCALE: &str = "en-US";
pub const HEADER_REQUEST_ID: &str = "x-request-id";

// Ed25519 seeds are always 32 raw bytes
pub const ED25519_SEED_LEN: usize = 32;

/// Replacement text for secrets in `Debug` output and wire logs.
pub const REDACTED: &str = "<redacted>";

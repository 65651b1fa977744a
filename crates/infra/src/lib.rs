//! # Signway Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport
//! - The API client facade and its builder
//! - Configuration loading (environment variables, TOML/JSON files)
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `signway-core`
//! - Depends on `signway-domain` and `signway-core`
//! - Contains all "impure" code (network, file and environment I/O)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, ApiResponse};
pub use self::http::{HttpTransportBuilder, ReqwestTransport};
pub use observability::init_tracing;

//! API client facade
//!
//! Wires the core pipeline (default headers, request signing, optional wire
//! logging, status classification, optional host failover) to a transport
//! and exposes typed request helpers.

pub mod client;

pub use client::{ApiClient, ApiClientBuilder, ApiResponse};

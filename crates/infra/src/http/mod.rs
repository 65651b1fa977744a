//! HTTP transport adapter

pub mod client;

pub use client::{HttpTransportBuilder, ReqwestTransport};

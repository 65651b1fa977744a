//! # Signway Domain
//!
//! Domain types for the signed-bearer API client.
//!
//! This crate contains:
//! - Signing identities (`Credential`, `KeyMaterial`)
//! - Client configuration structures
//! - The error taxonomy surfaced to callers
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Signway crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

//! Domain types and models

pub mod credential;

pub use credential::{Credential, KeyAlgorithm, KeyMaterial};

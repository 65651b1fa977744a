//! # Signway Core
//!
//! Request authentication and host-resilience logic - no infrastructure
//! dependencies.
//!
//! This crate contains:
//! - Port interfaces (transport, key resolution, clock)
//! - The token signer and default key resolver
//! - The host registry and active-credential slot
//! - The middleware pipeline and its stages (authenticator, failure
//!   classifier, failover controller, wire logger)
//!
//! ## Architecture Principles
//! - Only depends on `signway-domain`
//! - No network or file I/O; the transport is a trait
//! - Pure, testable logic

pub mod auth;
pub mod credentials;
pub mod failover;
pub mod hosts;
pub mod pipeline;
pub mod signing;
pub mod transport;

// Infrastructure ports
pub mod clock_ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use auth::RequestAuthenticator;
pub use clock_ports::{Clock, ManualClock, SystemClock};
pub use credentials::CredentialSlot;
pub use failover::{Classification, FailoverController, FailureClassifier, StatusClassifier};
pub use hosts::{HostRegistry, HostSnapshot};
pub use pipeline::{
    DefaultHeaders, Outcome, OutboundRequest, Pipeline, RequestStage, ResponseStage, WireLogger,
};
pub use signing::{
    KeyResolver, MaterialKeyResolver, ResolvedKey, SignedToken, TokenClaims, TokenHeader,
    TokenSigner,
};
pub use transport::{Transport, TransportRequest, TransportResponse};

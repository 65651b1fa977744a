//! Failure classification and host failover
//!
//! Every failed exchange maps to exactly one [`ApiError`]. HTTP statuses are
//! application-visible and never move the host pointer; 502 and friends are
//! recognised here from the status code alone. Transport failures whose kind
//! says the endpoint itself is unreachable (reset, timeout, DNS, TLS
//! handshake) may trigger a host switch, but the caller still receives the
//! original error and must resubmit.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use signway_domain::{ApiError, ErrorBody, TransportError};
use tracing::{debug, warn};

use crate::hosts::HostRegistry;
use crate::pipeline::{OutboundRequest, Outcome, ResponseStage};

/// Typed error plus the "host looks unreachable" signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub error: ApiError,
    pub host_unreachable: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailureClassifier;

impl FailureClassifier {
    /// Map an HTTP status to success or a typed error.
    ///
    /// # Errors
    /// `ClientError` for 4xx, `ServerError` for 5xx (502 included, code kept
    /// verbatim), `Decode` for informational or unfollowed redirect statuses.
    pub fn classify_status(status: StatusCode, body: &[u8]) -> Result<(), ApiError> {
        let code = status.as_u16();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(ApiError::ClientError { code, body: ErrorBody::parse(body) })
        } else if status.is_server_error() {
            Err(ApiError::ServerError { code, body: ErrorBody::parse(body) })
        } else {
            Err(ApiError::Decode(format!("unexpected HTTP status {code}")))
        }
    }

    pub fn classify_transport(error: TransportError) -> Classification {
        let host_unreachable = error.is_host_unreachable();
        Classification { error: ApiError::Transport(error), host_unreachable }
    }
}

/// Response stage applying [`FailureClassifier::classify_status`]
///
/// Successful responses pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier;

#[async_trait]
impl ResponseStage for StatusClassifier {
    fn name(&self) -> &'static str {
        "status_classifier"
    }

    async fn on_outcome(&self, outbound: &OutboundRequest, outcome: Outcome) -> Outcome {
        let response = outcome?;
        match FailureClassifier::classify_status(response.status, &response.body) {
            Ok(()) => Ok(response),
            Err(error) => {
                debug!(
                    request_id = %outbound.request_id,
                    status = response.status.as_u16(),
                    error = %error,
                    "non-success status"
                );
                Err(error)
            }
        }
    }
}

/// Response stage that advances the host registry on unreachable-host
/// transport failures
///
/// Installed only when auto-switch is enabled. The outcome is returned
/// unchanged.
#[derive(Debug, Clone)]
pub struct FailoverController {
    registry: Arc<HostRegistry>,
}

impl FailoverController {
    pub const fn new(registry: Arc<HostRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ResponseStage for FailoverController {
    fn name(&self) -> &'static str {
        "failover_controller"
    }

    async fn on_outcome(&self, outbound: &OutboundRequest, outcome: Outcome) -> Outcome {
        let Err(ApiError::Transport(error)) = &outcome else {
            return outcome;
        };

        let classification = FailureClassifier::classify_transport(error.clone());
        if !classification.host_unreachable {
            debug!(
                request_id = %outbound.request_id,
                kind = %error.kind,
                "transport failure does not indicate an unreachable host"
            );
            return outcome;
        }

        let switched = self.registry.switch_from(outbound.host_generation);
        warn!(
            request_id = %outbound.request_id,
            kind = %error.kind,
            switched,
            failed_host = %outbound.request.url.origin().ascii_serialization(),
            "host unreachable"
        );
        outcome
    }
}

//! Request authenticator stage
//!
//! Reads the active credential once, signs the request exactly as it will go
//! on the wire and attaches `Authorization: Bearer <token>`. The body is never
//! touched.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::HeaderValue;
use signway_domain::{ApiError, SigningError};
use tracing::trace;

use crate::clock_ports::Clock;
use crate::credentials::CredentialSlot;
use crate::pipeline::{OutboundRequest, RequestStage};
use crate::signing::TokenSigner;

#[derive(Clone)]
pub struct RequestAuthenticator {
    slot: Arc<CredentialSlot>,
    signer: TokenSigner,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthenticator").field("signer", &self.signer).finish_non_exhaustive()
    }
}

impl RequestAuthenticator {
    pub fn new(slot: Arc<CredentialSlot>, signer: TokenSigner, clock: Arc<dyn Clock>) -> Self {
        Self { slot, signer, clock }
    }
}

#[async_trait]
impl RequestStage for RequestAuthenticator {
    fn name(&self) -> &'static str {
        "authenticator"
    }

    async fn on_request(&self, mut outbound: OutboundRequest) -> Result<OutboundRequest, ApiError> {
        let credential = self.slot.active();
        let request = &outbound.request;
        let token = self.signer.sign(
            &credential,
            &request.method,
            &request.path_and_query(),
            &request.body,
            self.clock.now_unix(),
        )?;

        trace!(
            request_id = %outbound.request_id,
            uid = %token.claims().uid,
            iat = token.claims().iat,
            exp = token.claims().exp,
            "request signed"
        );

        let value = HeaderValue::from_str(&token.authorization_value())
            .map_err(|e| ApiError::from(SigningError::Encoding(e.to_string())))?;
        outbound.request.headers.insert(AUTHORIZATION, value);
        Ok(outbound)
    }
}

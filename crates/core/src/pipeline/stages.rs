//! Plumbing stages: default headers and verbose wire logging

use async_trait::async_trait;
use http::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue};
use signway_domain::constants::{HEADER_REQUEST_ID, REDACTED};
use signway_domain::ApiError;
use tracing::debug;

use super::{OutboundRequest, Outcome, RequestStage, ResponseStage};

const JSON: &str = "application/json";

/// Longest body prefix the wire logger prints
const WIRE_LOG_BODY_LIMIT: usize = 2048;

/// Adds user agent, locale, accept, content type and request id headers
///
/// Headers already present on the request are left alone.
#[derive(Debug, Clone)]
pub struct DefaultHeaders {
    user_agent: HeaderValue,
    locale: HeaderValue,
}

impl DefaultHeaders {
    /// # Errors
    /// Returns `ApiError::Config` when either value is not a valid header
    /// value.
    pub fn new(user_agent: &str, locale: &str) -> Result<Self, ApiError> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| ApiError::Config(format!("invalid user agent: {e}")))?;
        let locale = HeaderValue::from_str(locale)
            .map_err(|e| ApiError::Config(format!("invalid locale: {e}")))?;
        Ok(Self { user_agent, locale })
    }
}

#[async_trait]
impl RequestStage for DefaultHeaders {
    fn name(&self) -> &'static str {
        "default_headers"
    }

    async fn on_request(&self, mut outbound: OutboundRequest) -> Result<OutboundRequest, ApiError> {
        let has_body = !outbound.request.body.is_empty();
        let request_id = HeaderValue::from_str(&outbound.request_id)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid request id: {e}")))?;

        let headers = &mut outbound.request.headers;
        headers.entry(USER_AGENT).or_insert_with(|| self.user_agent.clone());
        headers.entry(ACCEPT_LANGUAGE).or_insert_with(|| self.locale.clone());
        headers.entry(ACCEPT).or_insert(HeaderValue::from_static(JSON));
        if has_body {
            headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(JSON));
        }
        headers.entry(HeaderName::from_static(HEADER_REQUEST_ID)).or_insert(request_id);
        Ok(outbound)
    }
}

/// Verbose request/response logging at `debug`
///
/// Installed only when debug logging is enabled. The Authorization header is
/// always redacted.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireLogger;

fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value =
                if name == AUTHORIZATION { REDACTED } else { value.to_str().unwrap_or("<binary>") };
            format!("{name}: {value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(&body[..body.len().min(WIRE_LOG_BODY_LIMIT)]);
    if body.len() > WIRE_LOG_BODY_LIMIT {
        format!("{text}... ({} bytes)", body.len())
    } else {
        text.into_owned()
    }
}

#[async_trait]
impl RequestStage for WireLogger {
    fn name(&self) -> &'static str {
        "wire_logger"
    }

    async fn on_request(&self, outbound: OutboundRequest) -> Result<OutboundRequest, ApiError> {
        let request = &outbound.request;
        debug!(
            request_id = %outbound.request_id,
            method = %request.method,
            url = %request.url,
            headers = %render_headers(&request.headers),
            body = %render_body(&request.body),
            "--> request"
        );
        Ok(outbound)
    }
}

#[async_trait]
impl ResponseStage for WireLogger {
    fn name(&self) -> &'static str {
        "wire_logger"
    }

    async fn on_outcome(&self, outbound: &OutboundRequest, outcome: Outcome) -> Outcome {
        match &outcome {
            Ok(response) => debug!(
                request_id = %outbound.request_id,
                status = response.status.as_u16(),
                headers = %render_headers(&response.headers),
                body = %render_body(&response.body),
                "<-- response"
            ),
            Err(error) => debug!(
                request_id = %outbound.request_id,
                error = %error,
                "<-- failed"
            ),
        }
        outcome
    }
}

//! Test doubles for the core ports
//!
//! Available to this crate's tests and, through the `test-utils` feature,
//! to downstream crates.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use signway_domain::TransportError;
use url::Url;

use crate::transport::{Transport, TransportRequest, TransportResponse};

type ScriptedOutcome = Result<TransportResponse, TransportError>;
type ScriptMap = Arc<Mutex<HashMap<String, VecDeque<ScriptedOutcome>>>>;
type RequestLog = Arc<Mutex<Vec<TransportRequest>>>;

/// Scripted in-memory transport
///
/// Outcomes are queued per origin (`scheme://host:port`) and consumed in
/// order. An origin with nothing queued answers `200 OK` with an empty body.
/// Every request is recorded, headers included.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    scripts: ScriptMap,
    requests: RequestLog,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `origin`.
    pub fn push_response(&self, origin: &str, status: u16, body: impl Into<Vec<u8>>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.push(origin, Ok(TransportResponse::new(status, body)));
    }

    /// Queue a transport failure for `origin`.
    pub fn push_error(&self, origin: &str, error: TransportError) {
        self.push(origin, Err(error));
    }

    fn push(&self, origin: &str, outcome: ScriptedOutcome) {
        self.scripts.lock().entry(normalize_origin(origin)).or_default().push_back(outcome);
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Requests sent to one origin.
    pub fn requests_to(&self, origin: &str) -> Vec<TransportRequest> {
        let origin = normalize_origin(origin);
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.origin().ascii_serialization() == origin)
            .cloned()
            .collect()
    }
}

fn normalize_origin(origin: &str) -> String {
    Url::parse(origin)
        .map(|url| url.origin().ascii_serialization())
        .unwrap_or_else(|_| origin.trim_end_matches('/').to_string())
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let origin = request.url.origin().ascii_serialization();
        self.requests.lock().push(request);

        self.scripts
            .lock()
            .get_mut(&origin)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(TransportResponse::new(StatusCode::OK, Vec::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn request(url: &str) -> TransportRequest {
        TransportRequest::new(Method::GET, Url::parse(url).unwrap(), Vec::new())
    }

    #[tokio::test]
    async fn scripted_outcomes_are_consumed_in_order() {
        let transport = MockTransport::new();
        transport.push_response("https://a.example.com/", 503, "down");
        transport.push_error("https://a.example.com", TransportError::timeout("slow"));

        let first = transport.send(request("https://a.example.com/x")).await.unwrap();
        assert_eq!(first.status, StatusCode::SERVICE_UNAVAILABLE);

        let second = transport.send(request("https://a.example.com/y")).await.unwrap_err();
        assert_eq!(second, TransportError::timeout("slow"));

        let third = transport.send(request("https://a.example.com/z")).await.unwrap();
        assert_eq!(third.status, StatusCode::OK);

        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.requests_to("https://a.example.com").len(), 3);
        assert!(transport.requests_to("https://b.example.com").is_empty());
    }
}

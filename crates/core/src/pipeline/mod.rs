//! Middleware pipeline
//!
//! An ordered list of request stages (`request -> request`) and response
//! stages (`outcome -> outcome`) fixed at client construction. One
//! `execute` call runs the request stages, hands the result to the transport
//! exactly once, and threads the outcome through the response stages. There
//! is no retry loop.

pub mod stages;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use signway_domain::ApiError;
use tracing::debug;
use uuid::Uuid;

pub use stages::{DefaultHeaders, WireLogger};

use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Result of one exchange as seen by response stages and callers
pub type Outcome = Result<TransportResponse, ApiError>;

/// A request travelling through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub request: TransportRequest,
    /// Host-registry generation the URL was resolved against
    pub host_generation: u64,
    pub request_id: String,
}

impl OutboundRequest {
    pub fn new(request: TransportRequest, host_generation: u64) -> Self {
        Self { request, host_generation, request_id: Uuid::new_v4().to_string() }
    }
}

/// Stage that rewrites a request before it is sent
#[async_trait]
pub trait RequestStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_request(&self, outbound: OutboundRequest) -> Result<OutboundRequest, ApiError>;
}

/// Stage that inspects or rewrites the outcome of a send
#[async_trait]
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_outcome(&self, outbound: &OutboundRequest, outcome: Outcome) -> Outcome;
}

#[derive(Clone, Default)]
pub struct Pipeline {
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request_stages", &self.request_stage_names())
            .field("response_stages", &self.response_stage_names())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.request_stages.push(stage);
        self
    }

    #[must_use]
    pub fn with_response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.response_stages.push(stage);
        self
    }

    pub fn request_stage_names(&self) -> Vec<&'static str> {
        self.request_stages.iter().map(|s| s.name()).collect()
    }

    pub fn response_stage_names(&self) -> Vec<&'static str> {
        self.response_stages.iter().map(|s| s.name()).collect()
    }

    /// Run one request through every stage and the transport.
    ///
    /// A request-stage failure short-circuits: nothing is sent and response
    /// stages do not run.
    ///
    /// # Errors
    /// Whatever the request stages or the response stages produce; transport
    /// failures arrive at the response stages as `ApiError::Transport`.
    pub async fn execute(&self, transport: &dyn Transport, outbound: OutboundRequest) -> Outcome {
        let mut outbound = outbound;
        for stage in &self.request_stages {
            outbound = stage.on_request(outbound).await?;
        }

        let started = Instant::now();
        let result = transport.send(outbound.request.clone()).await;
        debug!(
            request_id = %outbound.request_id,
            method = %outbound.request.method,
            url = %outbound.request.url,
            status = result.as_ref().ok().map(|r| r.status.as_u16()),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "exchange finished"
        );

        let mut outcome: Outcome = result.map_err(ApiError::from);
        for stage in &self.response_stages {
            outcome = stage.on_outcome(&outbound, outcome).await;
        }
        outcome
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use signway_core::{Transport, TransportRequest, TransportResponse};
use signway_domain::{ApiError, TimeoutConfig, TransportError};
use tracing::debug;

use crate::errors::{builder_error, IntoTransportError};

/// reqwest-backed [`Transport`].
///
/// Sends each request exactly once. Timeouts and keep-alive pings come from
/// [`TimeoutConfig`]; there is no retry loop here.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default timeouts.
    pub fn new() -> Result<Self, ApiError> {
        Self::builder().build()
    }

    /// Wrap an already configured reqwest client.
    pub const fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest { method, url, headers, body } = request;
        debug!(%method, %url, body_len = body.len(), "sending HTTP request");

        let response = self
            .client
            .request(method.clone(), url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                let transport = err.into_transport_error();
                debug!(%method, %url, kind = %transport.kind, error = %transport.message, "HTTP request failed");
                transport
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(IntoTransportError::into_transport_error)?;
        debug!(%method, %url, %status, body_len = body.len(), "received HTTP response");

        Ok(TransportResponse { status, headers, body: body.to_vec() })
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    read_timeout: Duration,
    timeout: Duration,
    ping_interval: Option<Duration>,
    accept_invalid_certs: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::from_timeouts(&TimeoutConfig::default())
    }
}

impl HttpTransportBuilder {
    /// Connect and read timeouts as configured; the overall deadline covers
    /// connect, write and read together.
    pub fn from_timeouts(timeouts: &TimeoutConfig) -> Self {
        Self {
            connect_timeout: timeouts.connect(),
            read_timeout: timeouts.read(),
            timeout: timeouts.total(),
            ping_interval: Some(timeouts.ping()).filter(|d| !d.is_zero()),
            accept_invalid_certs: false,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Overall deadline for one exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep-alive ping interval for idle connections; `None` disables it.
    pub fn ping_interval(mut self, interval: Option<Duration>) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Test-only helper to allow insecure TLS (e.g., self-signed certs).
    #[cfg(test)]
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, ApiError> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .timeout(self.timeout)
            .no_proxy();

        if let Some(interval) = self.ping_interval {
            builder = builder
                .tcp_keepalive(interval)
                .http2_keep_alive_interval(interval)
                .http2_keep_alive_while_idle(true);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|err| builder_error(&err))?;
        Ok(ReqwestTransport { client })
    }
}

#[cfg(test)]
mod tests {
    use http::header::{HeaderValue, AUTHORIZATION};
    use http::{Method, StatusCode};
    use signway_domain::TransportErrorKind;
    use url::Url;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request(method: Method, url: String, body: &[u8]) -> TransportRequest {
        TransportRequest::new(method, Url::parse(&url).unwrap(), body.to_vec())
    }

    #[tokio::test]
    async fn sends_method_headers_and_body_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(query_param("dry_run", "true"))
            .and(header("authorization", "Bearer abc"))
            .and(body_bytes(b"{\"qty\":1}".to_vec()))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let mut req =
            request(Method::POST, format!("{}/v1/orders?dry_run=true", server.uri()), b"{\"qty\":1}");
        req.headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));

        let response = transport.send(req).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.text(), "created");
    }

    #[tokio::test]
    async fn server_errors_are_responses_not_transport_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "5"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let response =
            transport.send(request(Method::GET, server.uri(), b"")).await.unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers.get("retry-after").unwrap(), "5");
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::builder()
            .timeout(Duration::from_millis(200))
            .read_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let err = transport.send(request(Method::GET, server.uri(), b"")).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Timeout);
    }

    #[test]
    fn builder_takes_timeouts_from_config() {
        let timeouts = TimeoutConfig { connect_secs: 1, read_secs: 2, write_secs: 3, ping_secs: 0 };
        let builder = HttpTransportBuilder::from_timeouts(&timeouts);
        assert_eq!(builder.connect_timeout, Duration::from_secs(1));
        assert_eq!(builder.read_timeout, Duration::from_secs(2));
        assert_eq!(builder.timeout, Duration::from_secs(6));
        assert_eq!(builder.ping_interval, None);
        assert!(builder.build().is_ok());
    }
}

//! Signed-request API client with host failover
//!
//! Every call is stamped with a fresh bearer token, sent once to the active
//! host and classified into exactly one typed error on failure. When
//! auto-switch is enabled an unreachable host is swapped out before the error
//! is returned; the caller decides whether to resubmit.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use signway_core::{
    Clock, CredentialSlot, DefaultHeaders, FailoverController, HostRegistry, KeyResolver,
    MaterialKeyResolver, OutboundRequest, Pipeline, RequestAuthenticator, StatusClassifier,
    SystemClock, TokenSigner, Transport, TransportRequest, TransportResponse, WireLogger,
};
use signway_domain::constants::{DEFAULT_LOCALE, DEFAULT_TOKEN_HORIZON_SECS, DEFAULT_USER_AGENT};
use signway_domain::{ApiError, ClientConfig, Credential, HostSets, TimeoutConfig};
use tracing::{debug, info, instrument};
use url::Url;

use crate::http::HttpTransportBuilder;

/// Successful response, passed through unchanged from the transport
pub type ApiResponse = TransportResponse;

/// Authenticated API client
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    registry: Arc<HostRegistry>,
    credentials: Arc<CredentialSlot>,
    key_resolver: Arc<dyn KeyResolver>,
    pipeline: Pipeline,
    debug_logging: bool,
    auto_switch: bool,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .field("debug_logging", &self.debug_logging)
            .field("auto_switch", &self.auto_switch)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Build a client from a loaded configuration with the default transport,
    /// clock and key resolver.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` for invalid settings and
    /// `ApiError::KeyResolution` for unusable key material.
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Sign and send one request against the active host.
    ///
    /// `path` is absolute and may carry a query string. The request is sent
    /// exactly once.
    ///
    /// # Errors
    ///
    /// - `KeyResolution` / `Signing` when the token cannot be produced; nothing
    ///   is sent
    /// - `ClientError` for 4xx and `ServerError` for 5xx responses
    /// - `Transport` for connectivity failures, after any host switch
    #[instrument(skip(self, body), fields(method = %method, path = %path, body_len = body.len()))]
    pub async fn authenticate_and_send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
    ) -> Result<ApiResponse, ApiError> {
        let host = self.registry.current();
        let url = host.url_for(path)?;
        debug!(host = %host.base_url, generation = host.generation, "dispatching request");

        let outbound = OutboundRequest::new(TransportRequest::new(method, url, body), host.generation);
        self.pipeline.execute(self.transport.as_ref(), outbound).await
    }

    /// Execute a GET request and decode the JSON response
    ///
    /// # Errors
    ///
    /// As [`Self::authenticate_and_send`], plus `Decode` when the body does
    /// not match `T`.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.authenticate_and_send(Method::GET, path, Vec::new()).await?;
        response.json()
    }

    /// Execute a POST request with a JSON body and decode the JSON response
    ///
    /// # Errors
    ///
    /// As [`Self::get_json`], plus `InvalidRequest` when `body` cannot be
    /// serialized.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {e}")))?;
        let response = self.authenticate_and_send(Method::POST, path, bytes).await?;
        response.json()
    }

    /// Execute a DELETE request and decode the JSON response (use `()` for
    /// bodiless replies)
    ///
    /// # Errors
    ///
    /// As [`Self::get_json`].
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.authenticate_and_send(Method::DELETE, path, Vec::new()).await?;
        response.json()
    }

    /// Sign all subsequent requests with `credential` instead of the
    /// client-level credential.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::KeyResolution` when the key material is unusable;
    /// the active credential is left unchanged.
    pub fn set_user_credential(&self, credential: Credential) -> Result<(), ApiError> {
        self.key_resolver.resolve(&credential)?;
        self.credentials.set_user_credential(credential);
        Ok(())
    }

    /// Revert to the client-level credential.
    pub fn clear_user_credential(&self) {
        self.credentials.clear_user_credential();
    }

    pub fn has_user_credential(&self) -> bool {
        self.credentials.has_user_credential()
    }

    pub fn active_credential(&self) -> Arc<Credential> {
        self.credentials.active()
    }

    pub fn current_base_url(&self) -> Url {
        self.registry.current_base_url()
    }

    /// Move to the next host by hand. Returns `false` with a single host.
    pub fn switch_host(&self) -> bool {
        self.registry.switch()
    }

    pub fn hosts(&self) -> &[Url] {
        self.registry.hosts()
    }

    pub const fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    pub const fn auto_switch_enabled(&self) -> bool {
        self.auto_switch
    }

    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Builder for API client
pub struct ApiClientBuilder {
    credential: Option<Credential>,
    hosts: HostSets,
    prefer_alternate_region: bool,
    debug_logging: bool,
    auto_switch: bool,
    timeouts: TimeoutConfig,
    user_agent: String,
    locale: String,
    token_horizon: Duration,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    key_resolver: Option<Arc<dyn KeyResolver>>,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            credential: None,
            hosts: HostSets::default(),
            prefer_alternate_region: false,
            debug_logging: false,
            auto_switch: false,
            timeouts: TimeoutConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            token_horizon: Duration::from_secs(DEFAULT_TOKEN_HORIZON_SECS),
            transport: None,
            clock: None,
            key_resolver: None,
        }
    }
}

impl fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("credential", &self.credential)
            .field("hosts", &self.hosts)
            .field("prefer_alternate_region", &self.prefer_alternate_region)
            .field("debug_logging", &self.debug_logging)
            .field("auto_switch", &self.auto_switch)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl ApiClientBuilder {
    /// Take every setting from a loaded configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.token_horizon = config.token_horizon();
        self.credential = Some(config.credential);
        self.hosts = config.hosts;
        self.prefer_alternate_region = config.prefer_alternate_region;
        self.debug_logging = config.debug_logging;
        self.auto_switch = config.auto_switch_on_host_failure;
        self.timeouts = config.timeouts;
        self.user_agent = config.user_agent;
        self.locale = config.locale;
        self
    }

    /// Set the client-level credential (required)
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Primary base URLs, in failover order
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.primary = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Alternate-region base URLs, used when
    /// [`prefer_alternate_region`](Self::prefer_alternate_region) is set
    pub fn alternate_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.alternate = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn prefer_alternate_region(mut self, enabled: bool) -> Self {
        self.prefer_alternate_region = enabled;
        self
    }

    /// Verbose wire logging at `debug`
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Switch hosts when the active one looks unreachable. Does not touch
    /// debug logging.
    pub fn enable_auto_switch(mut self) -> Self {
        self.auto_switch = true;
        self
    }

    pub fn auto_switch_on_host_failure(mut self, enabled: bool) -> Self {
        self.auto_switch = enabled;
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn token_horizon(mut self, horizon: Duration) -> Self {
        self.token_horizon = horizon;
        self
    }

    /// Replace the default reqwest transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn key_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.key_resolver = Some(resolver);
        self
    }

    /// Build the API client
    ///
    /// The credential's key material is resolved here, so malformed keys
    /// fail at build time rather than on the first request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the credential is missing or a setting
    /// is invalid, `ApiError::KeyResolution` for unusable key material.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let credential =
            self.credential.ok_or_else(|| ApiError::Config("Credential not set".to_string()))?;

        let config = ClientConfig {
            credential,
            hosts: self.hosts,
            prefer_alternate_region: self.prefer_alternate_region,
            debug_logging: self.debug_logging,
            auto_switch_on_host_failure: self.auto_switch,
            timeouts: self.timeouts,
            user_agent: self.user_agent,
            locale: self.locale,
            token_horizon_secs: self.token_horizon.as_secs(),
        };
        config.validate()?;

        let key_resolver: Arc<dyn KeyResolver> =
            self.key_resolver.unwrap_or_else(|| Arc::new(MaterialKeyResolver));
        key_resolver.resolve(&config.credential)?;

        let registry = Arc::new(HostRegistry::new(config.active_hosts())?);
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransportBuilder::from_timeouts(&config.timeouts).build()?),
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let signer = TokenSigner::new(Arc::clone(&key_resolver)).with_horizon(config.token_horizon());
        let credentials = Arc::new(CredentialSlot::new(config.credential.clone()));

        let mut pipeline = Pipeline::new()
            .with_request_stage(Arc::new(DefaultHeaders::new(&config.user_agent, &config.locale)?))
            .with_request_stage(Arc::new(RequestAuthenticator::new(
                Arc::clone(&credentials),
                signer,
                clock,
            )));
        if config.debug_logging {
            pipeline = pipeline
                .with_request_stage(Arc::new(WireLogger))
                .with_response_stage(Arc::new(WireLogger));
        }
        pipeline = pipeline.with_response_stage(Arc::new(StatusClassifier));
        if config.auto_switch_on_host_failure {
            pipeline =
                pipeline.with_response_stage(Arc::new(FailoverController::new(Arc::clone(&registry))));
        }

        info!(
            hosts = registry.len(),
            base_url = %registry.current_base_url(),
            prefer_alternate_region = config.prefer_alternate_region,
            debug_logging = config.debug_logging,
            auto_switch = config.auto_switch_on_host_failure,
            "API client ready"
        );

        Ok(ApiClient {
            transport,
            registry,
            credentials,
            key_resolver,
            pipeline,
            debug_logging: config.debug_logging,
            auto_switch: config.auto_switch_on_host_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use http::header::AUTHORIZATION;
    use signway_core::testing::{fixtures, MockTransport};
    use signway_core::{ManualClock, TokenClaims};
    use signway_domain::{KeyResolutionError, TransportError, TransportErrorKind};

    use super::*;

    const HOST_A: &str = "https://a.example.com";
    const HOST_B: &str = "https://b.example.com";

    fn builder(transport: &MockTransport) -> ApiClientBuilder {
        ApiClient::builder()
            .credential(fixtures::ed25519_credential())
            .hosts([HOST_A, HOST_B])
            .transport(Arc::new(transport.clone()))
            .clock(Arc::new(ManualClock::new(1_700_000_000)))
    }

    fn claims_of(request: &TransportRequest) -> TokenClaims {
        let header = request.headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        let payload = header.strip_prefix("Bearer ").unwrap().split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Account {
        id: u32,
    }

    #[tokio::test]
    async fn builder_missing_credential() {
        let result = ApiClient::builder().hosts([HOST_A]).build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn builder_rejects_malformed_key_eagerly() {
        let transport = MockTransport::new();
        let result = builder(&transport).credential(Credential::ed25519("u", "s", "abc")).build();
        assert!(matches!(result, Err(ApiError::KeyResolution(KeyResolutionError::InvalidSeed(_)))));
    }

    #[tokio::test]
    async fn auto_switch_does_not_enable_debug_logging() {
        let transport = MockTransport::new();
        let client = builder(&transport).enable_auto_switch().build().unwrap();

        assert!(client.auto_switch_enabled());
        assert!(!client.debug_logging());
        assert!(!client.pipeline().request_stage_names().contains(&"wire_logger"));
        assert_eq!(
            client.pipeline().response_stage_names(),
            vec!["status_classifier", "failover_controller"]
        );
    }

    #[tokio::test]
    async fn debug_logging_installs_wire_logger() {
        let transport = MockTransport::new();
        let client = builder(&transport).debug_logging(true).build().unwrap();
        assert_eq!(
            client.pipeline().request_stage_names(),
            vec!["default_headers", "authenticator", "wire_logger"]
        );
        assert!(!client.auto_switch_enabled());
    }

    #[tokio::test]
    async fn alternate_region_selects_alternate_hosts() {
        let transport = MockTransport::new();
        let client = builder(&transport)
            .alternate_hosts(["https://eu.example.com"])
            .prefer_alternate_region(true)
            .build()
            .unwrap();
        assert_eq!(client.current_base_url().as_str(), "https://eu.example.com/");
        assert_eq!(client.hosts().len(), 1);
    }

    #[tokio::test]
    async fn get_json_decodes_and_signs() {
        let transport = MockTransport::new();
        transport.push_response(HOST_A, 200, r#"{"id":7}"#);
        let client = builder(&transport).build().unwrap();

        let account: Account = client.get_json("/v1/account?verbose=1").await.unwrap();
        assert_eq!(account, Account { id: 7 });

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url.as_str(), "https://a.example.com/v1/account?verbose=1");
        let claims = claims_of(&sent[0]);
        assert_eq!(claims.uid, "client-user");
        assert_eq!(claims.exp - claims.iat, 30);
    }

    #[tokio::test]
    async fn status_errors_are_typed_and_never_switch() {
        let transport = MockTransport::new();
        transport.push_response(HOST_A, 503, "");
        transport.push_response(HOST_A, 404, r#"{"code":"NOT_FOUND","message":"no order"}"#);
        transport.push_response(HOST_A, 502, "<html>Bad Gateway</html>");
        let client = builder(&transport).enable_auto_switch().build().unwrap();

        let err = client.get_json::<Account>("/v1/a").await.unwrap_err();
        assert_eq!(err, ApiError::server(503));

        let err = client.delete::<()>("/v1/orders/1").await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert!(matches!(err, ApiError::ClientError { body: Some(_), .. }));

        let err = client.get_json::<Account>("/v1/a").await.unwrap_err();
        assert_eq!(err, ApiError::server(502));

        assert_eq!(client.current_base_url().as_str(), "https://a.example.com/");
    }

    #[tokio::test]
    async fn dns_failure_switches_exactly_once_without_retry() {
        let transport = MockTransport::new();
        let dns = TransportError::dns("failed to lookup address information");
        transport.push_error(HOST_A, dns.clone());
        let client = builder(&transport).enable_auto_switch().build().unwrap();

        let err = client.get_json::<Account>("/v1/a").await.unwrap_err();
        assert_eq!(err, ApiError::Transport(dns));
        assert_eq!(client.current_base_url().as_str(), "https://b.example.com/");
        assert_eq!(transport.request_count(), 1);

        // caller resubmits against the new host
        transport.push_response(HOST_B, 200, r#"{"id":1}"#);
        let account: Account = client.get_json("/v1/a").await.unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(transport.requests_to(HOST_B).len(), 1);
    }

    #[tokio::test]
    async fn unreachable_host_without_auto_switch_stays_put() {
        let transport = MockTransport::new();
        transport.push_error(HOST_A, TransportError::timeout("operation timed out"));
        let client = builder(&transport).build().unwrap();

        let err = client.get_json::<Account>("/v1/a").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError { kind: TransportErrorKind::Timeout, .. })));
        assert_eq!(client.current_base_url().as_str(), "https://a.example.com/");
    }

    #[tokio::test]
    async fn concurrent_failures_on_one_host_switch_once() {
        let transport = MockTransport::new();
        for _ in 0..5 {
            transport.push_error(HOST_A, TransportError::timeout("timed out"));
        }
        let client = Arc::new(
            builder(&transport)
                .hosts([HOST_A, HOST_B, "https://c.example.com"])
                .enable_auto_switch()
                .build()
                .unwrap(),
        );

        // Resolve every request against host A before any failure lands.
        let outbounds: Vec<_> = (0..5)
            .map(|_| {
                let host = client.registry.current();
                OutboundRequest::new(
                    TransportRequest::new(Method::GET, host.url_for("/v1/a").unwrap(), Vec::new()),
                    host.generation,
                )
            })
            .collect();
        let results = futures::future::join_all(
            outbounds.into_iter().map(|o| client.pipeline.execute(client.transport.as_ref(), o)),
        )
        .await;

        assert!(results.iter().all(Result::is_err));
        assert_eq!(client.current_base_url().as_str(), "https://b.example.com/");
    }

    #[tokio::test]
    async fn user_credential_overrides_and_clears() {
        let transport = MockTransport::new();
        let client = builder(&transport).build().unwrap();

        client.set_user_credential(fixtures::user_credential()).unwrap();
        assert!(client.has_user_credential());
        client.authenticate_and_send(Method::GET, "/v1/me", Vec::new()).await.unwrap();

        client.clear_user_credential();
        client.authenticate_and_send(Method::GET, "/v1/me", Vec::new()).await.unwrap();

        let sent = transport.requests();
        assert_eq!(claims_of(&sent[0]).uid, "end-user");
        assert_eq!(claims_of(&sent[1]).uid, "client-user");
    }

    #[tokio::test]
    async fn bad_user_credential_is_rejected_and_ignored() {
        let transport = MockTransport::new();
        let client = builder(&transport).build().unwrap();

        let err = client.set_user_credential(Credential::rsa("u", "s", "garbage")).unwrap_err();
        assert!(matches!(err, ApiError::KeyResolution(_)));
        assert!(!client.has_user_credential());
        assert_eq!(client.active_credential().user_id(), "client-user");
    }

    #[tokio::test]
    async fn post_json_sends_serialized_body() {
        let transport = MockTransport::new();
        transport.push_response(HOST_A, 204, "");
        let client = builder(&transport).build().unwrap();

        let body = serde_json::json!({ "symbol": "BTC", "qty": 2 });
        let (): () = client.post_json("/v1/orders", &body).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&sent[0].body).unwrap(), body);
        assert_eq!(sent[0].headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn relative_path_is_invalid_request() {
        let transport = MockTransport::new();
        let client = builder(&transport).build().unwrap();
        let err = client.authenticate_and_send(Method::GET, "v1/a", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn manual_switch_host() {
        let transport = MockTransport::new();
        let client = builder(&transport).build().unwrap();
        assert!(client.switch_host());
        assert_eq!(client.current_base_url().as_str(), "https://b.example.com/");

        let single = builder(&transport).hosts([HOST_A]).build().unwrap();
        assert!(!single.switch_host());
    }
}

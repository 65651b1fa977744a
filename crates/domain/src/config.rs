//! Client configuration
//!
//! Everything here is fixed at client build time. The settings mirror the
//! builder surface: a required credential, the candidate host sets, and the
//! opt-in switches for alternate region, wire logging and auto failover.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LOCALE, DEFAULT_PING_INTERVAL_SECS,
    DEFAULT_READ_TIMEOUT_SECS, DEFAULT_TOKEN_HORIZON_SECS, DEFAULT_USER_AGENT,
    DEFAULT_WRITE_TIMEOUT_SECS,
};
use crate::errors::{ApiError, Result};
use crate::types::Credential;

/// Transport timeouts, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub read_secs: u64,
    pub write_secs: u64,
    /// Keep-alive ping interval for idle connections
    pub ping_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_secs: DEFAULT_READ_TIMEOUT_SECS,
            write_secs: DEFAULT_WRITE_TIMEOUT_SECS,
            ping_secs: DEFAULT_PING_INTERVAL_SECS,
        }
    }
}

impl TimeoutConfig {
    pub const fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub const fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub const fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub const fn ping(&self) -> Duration {
        Duration::from_secs(self.ping_secs)
    }

    /// Upper bound for a whole exchange: connect, write the request, read
    /// the response.
    pub const fn total(&self) -> Duration {
        Duration::from_secs(
            self.connect_secs.saturating_add(self.read_secs).saturating_add(self.write_secs),
        )
    }
}

/// Candidate base URLs, in failover order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSets {
    pub primary: Vec<String>,
    #[serde(default)]
    pub alternate: Vec<String>,
}

/// Builder-time client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub credential: Credential,
    pub hosts: HostSets,
    #[serde(default)]
    pub prefer_alternate_region: bool,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub auto_switch_on_host_failure: bool,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_token_horizon")]
    pub token_horizon_secs: u64,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

const fn default_token_horizon() -> u64 {
    DEFAULT_TOKEN_HORIZON_SECS
}

impl ClientConfig {
    /// Configuration with every optional setting at its default.
    pub fn new(credential: Credential, primary_hosts: Vec<String>) -> Self {
        Self {
            credential,
            hosts: HostSets { primary: primary_hosts, alternate: Vec::new() },
            prefer_alternate_region: false,
            debug_logging: false,
            auto_switch_on_host_failure: false,
            timeouts: TimeoutConfig::default(),
            user_agent: default_user_agent(),
            locale: default_locale(),
            token_horizon_secs: DEFAULT_TOKEN_HORIZON_SECS,
        }
    }

    /// The host set the client will rotate through.
    pub fn active_hosts(&self) -> &[String] {
        if self.prefer_alternate_region {
            &self.hosts.alternate
        } else {
            &self.hosts.primary
        }
    }

    pub const fn token_horizon(&self) -> Duration {
        Duration::from_secs(self.token_horizon_secs)
    }

    /// Validate the configuration before a client is built from it.
    ///
    /// # Errors
    /// Returns `ApiError::Config` for a blank user/session id, an empty or
    /// unparsable active host set, a base URL with a query or fragment, a
    /// host listed twice, or a zero signing horizon.
    pub fn validate(&self) -> Result<()> {
        if self.credential.user_id().trim().is_empty() {
            return Err(ApiError::Config("credential user id is empty".into()));
        }
        if self.credential.session_id().trim().is_empty() {
            return Err(ApiError::Config("credential session id is empty".into()));
        }

        let hosts = self.active_hosts();
        if hosts.is_empty() {
            let set = if self.prefer_alternate_region { "alternate" } else { "primary" };
            return Err(ApiError::Config(format!("{set} host set is empty")));
        }
        let mut seen: Vec<Url> = Vec::with_capacity(hosts.len());
        for host in hosts {
            let url = Url::parse(host)
                .map_err(|e| ApiError::Config(format!("invalid base URL '{host}': {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ApiError::Config(format!(
                    "unsupported scheme '{}' in base URL '{host}'",
                    url.scheme()
                )));
            }
            if url.query().is_some() || url.fragment().is_some() {
                return Err(ApiError::Config(format!(
                    "base URL '{host}' must not carry a query or fragment"
                )));
            }
            if seen.contains(&url) {
                return Err(ApiError::Config(format!("duplicate base URL '{host}'")));
            }
            seen.push(url);
        }

        if self.token_horizon_secs == 0 {
            return Err(ApiError::Config("token horizon must be positive".into()));
        }
        Ok(())
    }
}

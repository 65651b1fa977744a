//! Host registry
//!
//! An ordered, non-empty list of candidate base URLs with a shared active
//! pointer. Every switch bumps a generation counter; failures carry the
//! generation they were observed against, so a burst of failures against one
//! dead host advances the pointer once instead of leapfrogging past a healthy
//! host.

use parking_lot::Mutex;
use signway_domain::ApiError;
use tracing::{debug, warn};
use url::Url;

/// Point-in-time view of the active host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSnapshot {
    pub base_url: Url,
    pub index: usize,
    pub generation: u64,
}

impl HostSnapshot {
    /// Join an absolute request path (with optional query) onto the base URL.
    ///
    /// Any path prefix on the base URL is kept: `https://h/api` + `/v1/x`
    /// gives `https://h/api/v1/x`.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidRequest` for a relative path or a result
    /// that does not parse as a URL.
    pub fn url_for(&self, path_and_query: &str) -> Result<Url, ApiError> {
        if !path_and_query.starts_with('/') {
            return Err(ApiError::InvalidRequest(format!(
                "request path must start with '/', got '{path_and_query}'"
            )));
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path_and_query}"))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid request URL: {e}")))
    }
}

#[derive(Debug)]
struct HostState {
    index: usize,
    generation: u64,
}

/// Shared, concurrency-safe set of candidate hosts
#[derive(Debug)]
pub struct HostRegistry {
    hosts: Vec<Url>,
    state: Mutex<HostState>,
}

impl HostRegistry {
    /// Build a registry; the first host starts active.
    ///
    /// # Errors
    /// Returns `ApiError::Config` when `hosts` is empty, an entry is not an
    /// absolute http(s) URL without query or fragment, or two entries name
    /// the same base URL.
    pub fn new<I, S>(hosts: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|host| {
                let host = host.as_ref();
                let url = Url::parse(host)
                    .map_err(|e| ApiError::Config(format!("invalid base URL '{host}': {e}")))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ApiError::Config(format!(
                        "unsupported scheme in base URL '{host}'"
                    )));
                }
                if url.query().is_some() || url.fragment().is_some() {
                    return Err(ApiError::Config(format!(
                        "base URL '{host}' must not carry a query or fragment"
                    )));
                }
                Ok(url)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if hosts.is_empty() {
            return Err(ApiError::Config("host registry needs at least one base URL".into()));
        }
        // Compared after normalisation, so `https://a` and `https://a/` collide.
        for (i, url) in hosts.iter().enumerate() {
            if hosts[..i].contains(url) {
                return Err(ApiError::Config(format!("duplicate base URL '{url}'")));
            }
        }

        Ok(Self { hosts, state: Mutex::new(HostState { index: 0, generation: 0 }) })
    }

    pub fn current(&self) -> HostSnapshot {
        let state = self.state.lock();
        HostSnapshot {
            base_url: self.hosts[state.index].clone(),
            index: state.index,
            generation: state.generation,
        }
    }

    pub fn current_base_url(&self) -> Url {
        let index = self.state.lock().index;
        self.hosts[index].clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Advance to the next host unconditionally.
    ///
    /// Returns `false` on a single-host registry, where switching is a no-op.
    pub fn switch(&self) -> bool {
        let mut state = self.state.lock();
        self.advance(&mut state)
    }

    /// Advance only if no switch happened since `observed` was read.
    ///
    /// Returns `true` when this call moved the pointer. Stale callers are
    /// coalesced into the switch that already happened.
    pub fn switch_from(&self, observed: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation != observed {
            debug!(
                observed,
                current = state.generation,
                "host switch coalesced with an earlier failover"
            );
            return false;
        }
        self.advance(&mut state)
    }

    fn advance(&self, state: &mut HostState) -> bool {
        if self.hosts.len() < 2 {
            debug!(host = %self.hosts[0], "single host registered; switch is a no-op");
            return false;
        }
        let from = state.index;
        state.index = (state.index + 1) % self.hosts.len();
        state.generation += 1;
        warn!(
            from = %self.hosts[from],
            to = %self.hosts[state.index],
            generation = state.generation,
            "switched active host"
        );
        true
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn hosts(&self) -> &[Url] {
        &self.hosts
    }
}

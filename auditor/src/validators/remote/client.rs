//! Metadata-only HTTP probes.
//!
//! Provides a trait-based abstraction over the `HEAD` request so that the
//! comparator can be exercised without network access.

use std::collections::BTreeMap;
use std::time::Duration;

/// Response metadata returned by a probe.
///
/// Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    status: u16,
    headers: BTreeMap<String, String>,
}

impl ProbeResponse {
    /// A response with `status` and no headers.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
        }
    }

    /// Add a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Value of header `name`, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Accept 2xx responses and classify every other status.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::NotFound`] for 404 and [`ProbeError::Status`]
    /// for any other non-2xx status.
    pub fn into_success(self, url: &str) -> Result<Self, ProbeError> {
        match self.status {
            200..=299 => Ok(self),
            404 => Err(ProbeError::NotFound {
                url: url.to_owned(),
            }),
            status => Err(ProbeError::Status {
                url: url.to_owned(),
                status,
            }),
        }
    }
}

/// Errors arising from a probe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The registry does not have the file (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The registry answered with an unexpected status.
    #[error("unexpected HTTP status {status} for {url}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// Status code received.
        status: u16,
    },

    /// The request did not produce a response.
    #[error("request failed for {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// Issues metadata-only requests.
///
/// Implementations are shared by every comparison worker of a run.
#[cfg_attr(test, mockall::automock)]
pub trait ProbeClient: Send + Sync {
    /// Send a `HEAD` request for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the request fails or the registry answers
    /// with a non-2xx status.
    fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError>;
}

/// Connection-pooled probe client using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpProbeClient {
    agent: ureq::Agent,
}

impl HttpProbeClient {
    /// Build a client keeping up to `max_connections` idle connections and
    /// bounding every request by `request_timeout`.
    #[must_use]
    pub fn new(max_connections: usize, request_timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(request_timeout))
            .max_idle_connections(max_connections)
            .max_idle_connections_per_host(max_connections)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl ProbeClient for HttpProbeClient {
    fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let response = self
            .agent
            .head(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let probe = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)))
            .fold(
                ProbeResponse::new(response.status().as_u16()),
                |probe, (name, value)| probe.with_header(name, value),
            );
        probe.into_success(url)
    }
}

/// Map a ureq error to a [`ProbeError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> ProbeError {
    match err {
        ureq::Error::StatusCode(404) => ProbeError::NotFound {
            url: url.to_owned(),
        },
        ureq::Error::StatusCode(status) => ProbeError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => ProbeError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

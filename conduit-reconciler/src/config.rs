//! Reconciler configuration
//!
//! Defines the tunables for talking to the remote APIs and for driving a
//! pipeline to its desired run state: polling cadence, bounded waits and
//! per-request timeouts.

use anyhow::Context;
use std::time::Duration;

/// Reconciler configuration
///
/// All timeouts and intervals are configurable so tests can shrink them and
/// operators can stretch them for slow clusters.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Control-plane base URL, used to resolve clusters on import
    pub control_plane_url: String,

    /// Bearer token for both control-plane and data-plane requests
    pub token: Option<String>,

    /// First delay between state polls; doubles after every miss
    pub poll_interval: Duration,

    /// Poll delay never grows past `poll_interval * max_poll_interval_factor`
    pub max_poll_interval_factor: u32,

    /// Default bound on a single start/stop convergence
    pub operation_timeout: Duration,

    /// Timeout applied to every individual HTTP request
    pub request_timeout: Duration,
}

impl ReconcilerConfig {
    /// Creates a new configuration with defaults
    pub fn new(control_plane_url: String) -> Self {
        Self {
            control_plane_url,
            token: None,
            poll_interval: Duration::from_secs(1),
            max_poll_interval_factor: 10,
            operation_timeout: Duration::from_secs(120), // 2 minutes
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - CONDUIT_CONTROL_PLANE_URL (optional, default: https://api.redpanda.com)
    /// - CONDUIT_TOKEN (optional)
    /// - CONDUIT_POLL_INTERVAL_MS (optional, milliseconds, default: 1000)
    /// - CONDUIT_OPERATION_TIMEOUT (optional, seconds, default: 120)
    /// - CONDUIT_REQUEST_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    ///
    /// Unset or empty variables keep their defaults; unparsable numbers are
    /// an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| -> anyhow::Result<Option<u64>> {
            var(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{} must be a whole number, got '{}'", key, v))
                })
                .transpose()
        };

        let mut config = Self::default();

        if let Some(url) = var("CONDUIT_CONTROL_PLANE_URL") {
            config.control_plane_url = url;
        }
        config.token = var("CONDUIT_TOKEN");

        if let Some(ms) = number("CONDUIT_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = number("CONDUIT_OPERATION_TIMEOUT")? {
            config.operation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = number("CONDUIT_REQUEST_TIMEOUT")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Sets the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Upper bound for the poll delay
    pub fn max_poll_interval(&self) -> Duration {
        self.poll_interval
            .saturating_mul(self.max_poll_interval_factor)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.control_plane_url.is_empty() {
            anyhow::bail!("control_plane_url cannot be empty");
        }

        if !self.control_plane_url.starts_with("http://")
            && !self.control_plane_url.starts_with("https://")
        {
            anyhow::bail!("control_plane_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_poll_interval_factor == 0 {
            anyhow::bail!("max_poll_interval_factor must be greater than 0");
        }

        if self.operation_timeout.is_zero() {
            anyhow::bail!("operation_timeout must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new("https://api.redpanda.com".to_string())
    }
}

//! Configuration module
//!
//! Handles CLI configuration: where tracked records live and how to reach
//! the remote APIs. Reconciler settings come from the `CONDUIT_*`
//! environment first; command-line flags override them.

use anyhow::{Context, Result};
use conduit_reconciler::ReconcilerConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Values given on the command line, each overriding the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub control_plane_url: Option<String>,
    pub token: Option<String>,
    pub operation_timeout: Option<u64>,
    pub request_timeout: Option<u64>,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file holding the tracked pipeline records
    pub state_file: PathBuf,

    /// Settings handed to the reconciler
    pub reconciler: ReconcilerConfig,
}

impl Config {
    /// Load reconciler settings from the environment and apply `overrides`
    pub fn load(state_file: PathBuf, overrides: Overrides) -> Result<Self> {
        let base = ReconcilerConfig::from_env().context("Invalid CONDUIT_* environment")?;
        Self::new(state_file, base, overrides)
    }

    pub fn new(state_file: PathBuf, base: ReconcilerConfig, overrides: Overrides) -> Result<Self> {
        let mut reconciler = base;
        if let Some(url) = overrides.control_plane_url {
            reconciler.control_plane_url = url;
        }
        if let Some(token) = overrides.token.filter(|t| !t.is_empty()) {
            reconciler = reconciler.with_token(token);
        }
        if let Some(secs) = overrides.operation_timeout {
            reconciler.operation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.request_timeout {
            reconciler.request_timeout = Duration::from_secs(secs);
        }
        reconciler.validate().context("Invalid configuration")?;

        Ok(Self {
            state_file,
            reconciler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ReconcilerConfig {
        ReconcilerConfig::from_lookup(|key| match key {
            "CONDUIT_CONTROL_PLANE_URL" => Some("https://env.example.com".to_string()),
            "CONDUIT_TOKEN" => Some("env-token".to_string()),
            "CONDUIT_OPERATION_TIMEOUT" => Some("300".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_environment_used_without_flags() {
        let config = Config::new(PathBuf::from("state.json"), base(), Overrides::default()).unwrap();

        assert_eq!(config.reconciler.control_plane_url, "https://env.example.com");
        assert_eq!(config.reconciler.token.as_deref(), Some("env-token"));
        assert_eq!(config.reconciler.operation_timeout, Duration::from_secs(300));
        assert_eq!(config.reconciler.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_flags_override_environment() {
        let overrides = Overrides {
            control_plane_url: Some("https://flag.example.com".to_string()),
            token: Some("flag-token".to_string()),
            operation_timeout: Some(60),
            request_timeout: Some(10),
        };

        let config = Config::new(PathBuf::from("state.json"), base(), overrides).unwrap();

        assert_eq!(config.reconciler.control_plane_url, "https://flag.example.com");
        assert_eq!(config.reconciler.token.as_deref(), Some("flag-token"));
        assert_eq!(config.reconciler.operation_timeout, Duration::from_secs(60));
        assert_eq!(config.reconciler.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_token_flag_keeps_environment_token() {
        let overrides = Overrides {
            token: Some(String::new()),
            ..Default::default()
        };

        let config = Config::new(PathBuf::from("state.json"), base(), overrides).unwrap();
        assert_eq!(config.reconciler.token.as_deref(), Some("env-token"));
    }

    #[test]
    fn test_config_rejects_bad_url() {
        let overrides = Overrides {
            control_plane_url: Some("api.example.com".to_string()),
            ..Default::default()
        };

        assert!(Config::new(PathBuf::from("state.json"), base(), overrides).is_err());
    }
}

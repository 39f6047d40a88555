//! Poll backoff
//!
//! Starts at the base poll interval, doubles after every poll that did not
//! reach the target, and stays at the cap once there.

use std::time::Duration;

use crate::config::ReconcilerConfig;

/// Polling cadence for state waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub base_interval: Duration,
    pub max_interval: Duration,
}

impl PollSettings {
    pub fn new(base_interval: Duration, max_interval: Duration) -> Self {
        Self {
            base_interval,
            max_interval: max_interval.max(base_interval),
        }
    }

    pub fn from_config(config: &ReconcilerConfig) -> Self {
        Self::new(config.poll_interval, config.max_poll_interval())
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&ReconcilerConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(settings: &PollSettings) -> Self {
        Self {
            current: settings.base_interval,
            max: settings.max_interval,
        }
    }

    /// Delay to wait now; the following call returns the doubled delay
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

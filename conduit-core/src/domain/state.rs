//! Pipeline lifecycle states
//!
//! The remote API reports a fine-grained lifecycle state (`STATE_STARTING`,
//! `STATE_RUNNING`, ...). Users only ever declare one of two run states.
//! Both representations are kept explicit: the recorded state may hold either
//! a fine-grained value or a normalized one, and [`equivalent`] decides when a
//! fresh observation is close enough to keep what was recorded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a remote pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Completed,
    Error,
    /// Fallback for any wire value this client does not recognize
    Unknown,
}

impl LifecycleState {
    /// All states, in wire order
    pub const ALL: [LifecycleState; 7] = [
        LifecycleState::Starting,
        LifecycleState::Running,
        LifecycleState::Stopping,
        LifecycleState::Stopped,
        LifecycleState::Completed,
        LifecycleState::Error,
        LifecycleState::Unknown,
    ];

    /// Decode a state string into the lifecycle vocabulary
    ///
    /// Accepts both the wire names (`STATE_RUNNING`) and the recorded
    /// lowercase form (`running`). Never fails: anything else is `Unknown`.
    pub fn decode(value: &str) -> Self {
        let name = value.strip_prefix("STATE_").unwrap_or(value);
        match name.to_ascii_lowercase().as_str() {
            "starting" => LifecycleState::Starting,
            "running" => LifecycleState::Running,
            "stopping" => LifecycleState::Stopping,
            "stopped" => LifecycleState::Stopped,
            "completed" => LifecycleState::Completed,
            "error" => LifecycleState::Error,
            _ => LifecycleState::Unknown,
        }
    }

    /// The string stored in a pipeline record for this state
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Completed => "completed",
            LifecycleState::Error => "error",
            LifecycleState::Unknown => "unknown",
        }
    }

    /// The wire name the remote API uses for this state
    pub fn wire_name(&self) -> &'static str {
        match self {
            LifecycleState::Starting => "STATE_STARTING",
            LifecycleState::Running => "STATE_RUNNING",
            LifecycleState::Stopping => "STATE_STOPPING",
            LifecycleState::Stopped => "STATE_STOPPED",
            LifecycleState::Completed => "STATE_COMPLETED",
            LifecycleState::Error => "STATE_ERROR",
            LifecycleState::Unknown => "STATE_UNSPECIFIED",
        }
    }

    pub fn is_running_family(&self) -> bool {
        matches!(self, LifecycleState::Starting | LifecycleState::Running)
    }

    pub fn is_stopped_family(&self) -> bool {
        matches!(
            self,
            LifecycleState::Stopping | LifecycleState::Stopped | LifecycleState::Completed
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run state a user can declare for a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredRunState {
    Running,
    Stopped,
}

impl DesiredRunState {
    /// Parse a declared run state; anything other than `running` or
    /// `stopped` means no preference
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(DesiredRunState::Running),
            "stopped" => Some(DesiredRunState::Stopped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredRunState::Running => "running",
            DesiredRunState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for DesiredRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DesiredRunState> for LifecycleState {
    fn from(state: DesiredRunState) -> Self {
        match state {
            DesiredRunState::Running => LifecycleState::Running,
            DesiredRunState::Stopped => LifecycleState::Stopped,
        }
    }
}

/// Project an observed lifecycle state onto the two declarable run states
///
/// Failed, finished and unrecognized pipelines are never reported as running.
pub fn normalize(observed: LifecycleState) -> DesiredRunState {
    if observed.is_running_family() {
        DesiredRunState::Running
    } else {
        DesiredRunState::Stopped
    }
}

/// Whether a recorded state and an observed state describe the same
/// operational condition
///
/// `starting`/`running` are interchangeable, as are
/// `stopping`/`stopped`/`completed`. Other values match only on exact
/// equality. An `error` on either side never matches, so a stale error is
/// always re-surfaced from the fresh observation.
pub fn equivalent(prior: &str, observed: &str) -> bool {
    let prior_state = LifecycleState::decode(prior);
    let observed_state = LifecycleState::decode(observed);

    if prior_state == LifecycleState::Error || observed_state == LifecycleState::Error {
        return false;
    }

    if prior_state.is_running_family() && observed_state.is_running_family() {
        return true;
    }

    if prior_state.is_stopped_family() && observed_state.is_stopped_family() {
        return true;
    }

    prior == observed
}

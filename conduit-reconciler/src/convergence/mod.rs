//! Convergence layer
//!
//! Drives a remote pipeline to a desired run state: issue the start or stop
//! command, wait (bounded, with backoff) for the target state, then fetch a
//! fresh snapshot. Nothing here fails hard. Every outcome is reported as a
//! [`ConvergenceResult`] and the orchestrator decides whether it is an error
//! or a warning.

mod backoff;
mod cancel;
mod wait;

pub use backoff::{Backoff, PollSettings};
pub use cancel::{Cancellation, cancellation};
pub use wait::{WaitOutcome, wait_for_state};

use conduit_client::{PipelineApi, PipelineSnapshot};
use conduit_core::domain::state::{DesiredRunState, LifecycleState};
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one start/stop convergence
///
/// `succeeded` with no snapshot means the target state was confirmed but the
/// final re-fetch failed; callers should fall back to what they already hold.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceResult {
    pub snapshot: Option<PipelineSnapshot>,
    pub warning: String,
    pub succeeded: bool,
}

impl ConvergenceResult {
    fn failed(warning: String) -> Self {
        Self {
            snapshot: None,
            warning,
            succeeded: false,
        }
    }
}

/// Start/stop driver shared by create, update and delete
#[derive(Debug, Clone, Default)]
pub struct Convergence {
    settings: PollSettings,
    cancel: Cancellation,
}

impl Convergence {
    pub fn new(settings: PollSettings, cancel: Cancellation) -> Self {
        Self { settings, cancel }
    }

    /// Start a pipeline and wait until it is running
    pub async fn start_pipeline(
        &self,
        api: &dyn PipelineApi,
        id: &str,
        timeout: Duration,
    ) -> ConvergenceResult {
        self.converge(api, id, DesiredRunState::Running, timeout).await
    }

    /// Stop a pipeline and wait until it is stopped
    pub async fn stop_pipeline(
        &self,
        api: &dyn PipelineApi,
        id: &str,
        timeout: Duration,
    ) -> ConvergenceResult {
        self.converge(api, id, DesiredRunState::Stopped, timeout).await
    }

    /// Issue the command for `target` and wait for it to take effect
    pub async fn converge(
        &self,
        api: &dyn PipelineApi,
        id: &str,
        target: DesiredRunState,
        timeout: Duration,
    ) -> ConvergenceResult {
        let (verb, command) = match target {
            DesiredRunState::Running => ("start", api.start_pipeline(id).await),
            DesiredRunState::Stopped => ("stop", api.stop_pipeline(id).await),
        };

        if let Err(e) = command {
            warn!("Failed to {} pipeline {}: {}", verb, id, e);
            return ConvergenceResult::failed(format!("failed to {} pipeline: {}", verb, e));
        }

        info!(
            "Waiting up to {:?} for pipeline {} to reach {}",
            timeout, id, target
        );

        let outcome = wait_for_state(
            api,
            id,
            LifecycleState::from(target),
            timeout,
            &self.settings,
            &self.cancel,
        )
        .await;

        match outcome {
            WaitOutcome::Reached => {
                let snapshot = match api.get_pipeline(id).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        warn!(
                            "Pipeline {} reached {} but could not be re-fetched: {}",
                            id, target, e
                        );
                        None
                    }
                };
                ConvergenceResult {
                    snapshot,
                    warning: String::new(),
                    succeeded: true,
                }
            }
            WaitOutcome::Failed(reason) => {
                warn!("Pipeline {} did not reach {}: {}", id, target, reason);
                ConvergenceResult::failed(reason)
            }
            WaitOutcome::TimedOut => {
                warn!("Timed out waiting for pipeline {} to reach {}", id, target);
                ConvergenceResult::failed(format!(
                    "timed out after {:?} waiting for pipeline to reach {}",
                    timeout, target
                ))
            }
        }
    }
}

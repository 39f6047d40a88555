//! Bounded wait for a pipeline to reach a lifecycle state
//!
//! Each tick fetches the pipeline once and ends the wait on the target state,
//! on `error`, on a fetch failure, on cancellation, or when the deadline
//! passes. Between ticks the loop sleeps for the current backoff delay,
//! clipped so that it never sleeps past the deadline.

use conduit_client::PipelineApi;
use conduit_core::domain::state::LifecycleState;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::backoff::{Backoff, PollSettings};
use super::cancel::Cancellation;

/// Terminal result of a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Reached,
    Failed(String),
    TimedOut,
}

/// Poll `id` until it reaches `target`
pub async fn wait_for_state(
    api: &dyn PipelineApi,
    id: &str,
    target: LifecycleState,
    timeout: Duration,
    settings: &PollSettings,
    cancel: &Cancellation,
) -> WaitOutcome {
    let deadline = Instant::now() + timeout;
    let mut backoff = Backoff::new(settings);
    let mut cancel = cancel.clone();
    let mut polls: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Failed("operation cancelled".to_string());
        }

        if Instant::now() >= deadline {
            debug!(
                "Gave up waiting for pipeline {} to reach {} after {} poll(s)",
                id, target, polls
            );
            return WaitOutcome::TimedOut;
        }

        polls += 1;
        match api.get_pipeline(id).await {
            Ok(snapshot) => {
                let state = snapshot.lifecycle_state();
                if state == target {
                    debug!("Pipeline {} reached {} after {} poll(s)", id, target, polls);
                    return WaitOutcome::Reached;
                }
                if state == LifecycleState::Error {
                    return WaitOutcome::Failed("pipeline entered error state".to_string());
                }
                debug!("Pipeline {} is {}, waiting for {}", id, state, target);
            }
            Err(e) => {
                return WaitOutcome::Failed(format!("failed to get pipeline state: {}", e));
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return WaitOutcome::TimedOut;
        }
        cancel.sleep(backoff.next_delay().min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convergence::cancel::cancellation;
    use crate::testing::{Call, FakePipelineApi, Transition};

    fn settings() -> PollSettings {
        PollSettings::new(Duration::from_secs(1), Duration::from_secs(10))
    }

    fn gets(api: &FakePipelineApi) -> usize {
        api.count(|c| matches!(c, Call::Get(_)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reached_immediately() {
        let api = FakePipelineApi::existing("STATE_RUNNING");

        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Running,
            Duration::from_secs(120),
            &settings(),
            &Cancellation::never(),
        )
        .await;

        assert_eq!(outcome, WaitOutcome::Reached);
        assert_eq!(gets(&api), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reached_after_intermediate_states() {
        let api = FakePipelineApi::existing("STATE_RUNNING");
        api.stop_pipeline("p-1").await.unwrap();

        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Stopped,
            Duration::from_secs(120),
            &settings(),
            &Cancellation::never(),
        )
        .await;

        assert_eq!(outcome, WaitOutcome::Reached);
        assert_eq!(gets(&api), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_state_fails_fast() {
        let api = FakePipelineApi::existing("STATE_STARTING")
            .on_start(Transition::Settle(vec!["STATE_STARTING", "STATE_ERROR"]));
        api.start_pipeline("p-1").await.unwrap();

        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Running,
            Duration::from_secs(120),
            &settings(),
            &Cancellation::never(),
        )
        .await;

        assert_eq!(
            outcome,
            WaitOutcome::Failed("pipeline entered error state".to_string())
        );
        assert_eq!(gets(&api), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_fails() {
        let api = FakePipelineApi::existing("STATE_STOPPED").fail_get(500);

        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Running,
            Duration::from_secs(120),
            &settings(),
            &Cancellation::never(),
        )
        .await;

        match outcome {
            WaitOutcome::Failed(reason) => {
                assert!(reason.starts_with("failed to get pipeline state: "));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_pipeline_times_out_with_few_polls() {
        let api = FakePipelineApi::existing("STATE_STOPPING");
        let timeout = Duration::from_secs(120);
        let start = Instant::now();

        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Stopped,
            timeout,
            &settings(),
            &Cancellation::never(),
        )
        .await;

        assert_eq!(outcome, WaitOutcome::TimedOut);
        // Timer granularity is one millisecond
        assert!(start.elapsed() <= timeout + Duration::from_millis(1));
        // 1+2+4+8 to reach the cap, then one poll per 10s for the rest
        assert!(gets(&api) <= 16, "issued {} polls", gets(&api));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_timeout_clips_sleep() {
        let api = FakePipelineApi::existing("STATE_STOPPING");
        let start = Instant::now();

        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Stopped,
            Duration::from_millis(1500),
            &settings(),
            &Cancellation::never(),
        )
        .await;

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(gets(&api), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_wait() {
        let api = FakePipelineApi::existing("STATE_STOPPING");
        let (tx, cancel) = cancellation();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = tx.send(true);
        });

        let start = Instant::now();
        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Stopped,
            Duration::from_secs(120),
            &settings(),
            &cancel,
        )
        .await;

        assert_eq!(outcome, WaitOutcome::Failed("operation cancelled".to_string()));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_issues_no_polls() {
        let api = FakePipelineApi::existing("STATE_STOPPING");
        let (tx, cancel) = cancellation();
        tx.send(true).unwrap();

        let outcome = wait_for_state(
            &api,
            "p-1",
            LifecycleState::Stopped,
            Duration::from_secs(120),
            &settings(),
            &cancel,
        )
        .await;

        assert_eq!(outcome, WaitOutcome::Failed("operation cancelled".to_string()));
        assert_eq!(gets(&api), 0);
    }
}

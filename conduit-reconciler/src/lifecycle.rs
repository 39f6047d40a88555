//! Pipeline lifecycle orchestration
//!
//! The create, read, update, delete and import entry points. Each one opens
//! its own connection, talks to the remote API, optionally drives the run
//! state through [`Convergence`], and merges the result into the record to
//! persist.
//!
//! Failure policy:
//! - the primary mutating call failing is a hard error and nothing is written
//! - convergence failing is a warning; the record is still written
//! - a pipeline that vanished is removed from tracked state only when
//!   `allow_deletion` permits it

use conduit_client::{ClusterApi, PipelineApi, PipelineSnapshot};
use conduit_core::domain::pipeline::{Operation, PipelineRecord};
use conduit_core::domain::state::{DesiredRunState, LifecycleState, normalize};
use conduit_core::merge::{ContingentFields, merge};
use std::time::Duration;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::config::ReconcilerConfig;
use crate::connect::{Connector, ImportId, resolve_cluster_endpoint};
use crate::convergence::{Cancellation, Convergence, ConvergenceResult, PollSettings};
use crate::diagnostics::{Diagnostics, Outcome};

/// Orchestrates the lifecycle of remote pipelines
pub struct PipelineReconciler<C: Connector> {
    connector: C,
    convergence: Convergence,
    operation_timeout: Duration,
}

impl<C: Connector> PipelineReconciler<C> {
    pub fn new(connector: C, config: &ReconcilerConfig, cancel: Cancellation) -> Self {
        Self {
            connector,
            convergence: Convergence::new(PollSettings::from_config(config), cancel),
            operation_timeout: config.operation_timeout,
        }
    }

    /// Create the pipeline described by `plan`, then drive it to the
    /// declared run state
    pub async fn create(&self, plan: &PipelineRecord) -> Outcome {
        let span = info_span!(
            "create_pipeline",
            op_id = %Uuid::new_v4(),
            display_name = %plan.display_name
        );
        self.create_inner(plan).instrument(span).await
    }

    /// Refresh a tracked record from the remote side
    pub async fn read(&self, prior: &PipelineRecord) -> Outcome {
        let span = info_span!("read_pipeline", op_id = %Uuid::new_v4(), pipeline_id = %prior.id);
        self.read_inner(prior).instrument(span).await
    }

    /// Apply `plan` to the pipeline tracked as `prior`
    pub async fn update(&self, plan: &PipelineRecord, prior: &PipelineRecord) -> Outcome {
        let span = info_span!("update_pipeline", op_id = %Uuid::new_v4(), pipeline_id = %prior.id);
        self.update_inner(plan, prior).instrument(span).await
    }

    /// Delete the pipeline tracked as `prior`
    pub async fn delete(&self, prior: &PipelineRecord) -> Outcome {
        let span = info_span!("delete_pipeline", op_id = %Uuid::new_v4(), pipeline_id = %prior.id);
        self.delete_inner(prior).instrument(span).await
    }

    /// Seed a record for an existing pipeline from `<pipeline_id>,<cluster_id>`
    ///
    /// The seeded record never permits deletion; follow with [`Self::read`]
    /// to fill in the remote fields.
    pub async fn import(&self, import_id: &str, clusters: &dyn ClusterApi) -> Outcome {
        let span = info_span!("import_pipeline", op_id = %Uuid::new_v4(), import_id = %import_id);
        async move {
            let id = match ImportId::parse(import_id) {
                Ok(id) => id,
                Err(e) => return Outcome::failed("invalid import ID", e.to_string()),
            };

            let endpoint = match resolve_cluster_endpoint(clusters, &id.cluster_id).await {
                Ok(endpoint) => endpoint,
                Err(e) => return Outcome::failed("failed to resolve cluster", e.to_string()),
            };

            info!("Importing pipeline {} from {}", id.pipeline_id, endpoint);
            let record = PipelineRecord {
                id: id.pipeline_id,
                cluster_api_url: Some(endpoint),
                allow_deletion: Some(false),
                ..Default::default()
            };
            Outcome::persist(record, Diagnostics::new())
        }
        .instrument(span)
        .await
    }

    async fn create_inner(&self, plan: &PipelineRecord) -> Outcome {
        let api = match self.open(plan.cluster_api_url.as_deref()).await {
            Ok(api) => api,
            Err(outcome) => return outcome,
        };
        let mut diagnostics = Diagnostics::new();

        info!("Creating pipeline '{}'", plan.display_name);
        let created = match api.create_pipeline(plan.to_spec()).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_permission_denied() => {
                return Outcome::failed(
                    "failed to create pipeline",
                    format!(
                        "{}; check that the credentials are allowed to manage pipelines on this cluster",
                        e
                    ),
                );
            }
            Err(e) => return Outcome::failed("failed to create pipeline", e.to_string()),
        };
        info!(
            "Created pipeline {} in state {}",
            created.id,
            created.lifecycle_state()
        );

        let timeout = plan.timeout(Operation::Create, self.operation_timeout);
        let latest = self
            .reconcile_run_state(
                api.as_ref(),
                created,
                plan.desired_run_state(),
                timeout,
                &mut diagnostics,
            )
            .await;

        Outcome::persist(merge(&latest, &ContingentFields::from_record(plan)), diagnostics)
    }

    async fn read_inner(&self, prior: &PipelineRecord) -> Outcome {
        let diagnostics = Diagnostics::new();

        let Some(endpoint) = prior.cluster_api_url.as_deref().filter(|u| !u.is_empty()) else {
            return gone(prior, "cluster_api_url is not set", diagnostics);
        };
        if prior.id.is_empty() {
            return gone(prior, "record has no pipeline id", diagnostics);
        }

        let api = match self.open(Some(endpoint)).await {
            Ok(api) => api,
            Err(outcome) => return outcome,
        };

        match api.get_pipeline(&prior.id).await {
            Ok(snapshot) => Outcome::persist(
                merge(&snapshot, &ContingentFields::from_record(prior)),
                diagnostics,
            ),
            Err(e) if e.is_not_found() || e.is_unreachable() => {
                gone(prior, &e.to_string(), diagnostics)
            }
            Err(e) => Outcome::failed("failed to read pipeline", e.to_string()),
        }
    }

    async fn update_inner(&self, plan: &PipelineRecord, prior: &PipelineRecord) -> Outcome {
        if prior.id.is_empty() {
            return Outcome::failed("failed to update pipeline", "record has no pipeline id");
        }
        let id = prior.id.as_str();

        let mut contingent = ContingentFields::from_record(plan);
        if contingent.cluster_api_url.is_none() {
            contingent.cluster_api_url = prior.cluster_api_url.clone();
        }

        let api = match self.open(contingent.cluster_api_url.as_deref()).await {
            Ok(api) => api,
            Err(outcome) => return outcome,
        };
        let mut diagnostics = Diagnostics::new();
        let timeout = plan.timeout(Operation::Update, self.operation_timeout);

        let current = match api.get_pipeline(id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Outcome::failed("failed to read pipeline before update", e.to_string()),
        };

        // Definitions can only be changed while the pipeline is stopped
        let was_running = current.lifecycle_state().is_running_family();
        if was_running {
            info!("Stopping pipeline {} before update", id);
            let result = self.convergence.stop_pipeline(api.as_ref(), id, timeout).await;
            if !result.succeeded {
                diagnostics.warning("failed to stop pipeline before update", result.warning);
            }
        }

        info!("Updating pipeline {}", id);
        let updated = match api.update_pipeline(id, plan.to_spec()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                diagnostics.error("failed to update pipeline", e.to_string());
                return Outcome::unchanged(diagnostics);
            }
        };

        // Without a declared state, restore whatever was running before
        let desired = plan
            .desired_run_state()
            .or(was_running.then_some(DesiredRunState::Running));
        let latest = self
            .reconcile_run_state(api.as_ref(), updated, desired, timeout, &mut diagnostics)
            .await;

        Outcome::persist(merge(&latest, &contingent), diagnostics)
    }

    async fn delete_inner(&self, prior: &PipelineRecord) -> Outcome {
        if !prior.deletion_permitted() {
            return Outcome::failed(
                "pipeline deletion not allowed",
                format!(
                    "allow_deletion must be set to true to delete pipeline {}",
                    prior.id
                ),
            );
        }

        let mut diagnostics = Diagnostics::new();
        if prior.id.is_empty() {
            diagnostics.info("pipeline already deleted", "record has no pipeline id");
            return Outcome::remove(diagnostics);
        }
        let id = prior.id.as_str();

        let api = match self.open(prior.cluster_api_url.as_deref()).await {
            Ok(api) => api,
            Err(outcome) => return outcome,
        };
        let timeout = prior.timeout(Operation::Delete, self.operation_timeout);

        match api.get_pipeline(id).await {
            Ok(snapshot) if snapshot.lifecycle_state().is_running_family() => {
                info!("Stopping pipeline {} before delete", id);
                let result = self.convergence.stop_pipeline(api.as_ref(), id, timeout).await;
                if !result.succeeded {
                    diagnostics.warning("failed to stop pipeline before delete", result.warning);
                }
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                info!("Pipeline {} is already gone", id);
                diagnostics.info("pipeline already deleted", format!("pipeline {} was not found", id));
                return Outcome::remove(diagnostics);
            }
            Err(e) => return Outcome::failed("failed to read pipeline before delete", e.to_string()),
        }

        info!("Deleting pipeline {}", id);
        match api.delete_pipeline(id).await {
            Ok(()) => Outcome::remove(diagnostics),
            Err(e) if e.is_not_found() => {
                diagnostics.info("pipeline already deleted", format!("pipeline {} was not found", id));
                Outcome::remove(diagnostics)
            }
            Err(e) => {
                diagnostics.error("failed to delete pipeline", e.to_string());
                Outcome::unchanged(diagnostics)
            }
        }
    }

    async fn open(&self, endpoint: Option<&str>) -> Result<Box<dyn PipelineApi>, Outcome> {
        let Some(endpoint) = endpoint.filter(|u| !u.is_empty()) else {
            return Err(Outcome::failed(
                "missing cluster_api_url",
                "cluster_api_url is required to reach the pipeline API",
            ));
        };

        self.connector
            .connect(endpoint)
            .await
            .map_err(|e| Outcome::failed("failed to create pipeline client", e.to_string()))
    }

    /// Converge `current` to `desired` once if its normalized state differs
    ///
    /// Returns the freshest snapshot available afterwards.
    async fn reconcile_run_state(
        &self,
        api: &dyn PipelineApi,
        current: PipelineSnapshot,
        desired: Option<DesiredRunState>,
        timeout: Duration,
        diagnostics: &mut Diagnostics,
    ) -> PipelineSnapshot {
        let Some(desired) = desired else {
            return current;
        };
        if normalize(current.lifecycle_state()) == desired {
            return current;
        }

        info!(
            "Pipeline {} is {}, converging to {}",
            current.id,
            current.lifecycle_state(),
            desired
        );
        let result = self
            .convergence
            .converge(api, &current.id, desired, timeout)
            .await;
        absorb(current, desired, result, diagnostics)
    }
}

/// Fold a convergence result into the snapshot held before it started
fn absorb(
    held: PipelineSnapshot,
    target: DesiredRunState,
    result: ConvergenceResult,
    diagnostics: &mut Diagnostics,
) -> PipelineSnapshot {
    if !result.succeeded {
        diagnostics.warning(
            format!("pipeline did not reach state {}", target),
            result.warning,
        );
        return held;
    }

    match result.snapshot {
        Some(snapshot) => snapshot,
        None => {
            diagnostics.warning(
                "failed to refresh pipeline after state change",
                format!(
                    "pipeline {} reached {} but could not be re-read; the next refresh will pick up its remaining fields",
                    held.id, target
                ),
            );
            // The wait loop confirmed the target, so only the state is advanced
            let mut snapshot = held;
            snapshot.state = LifecycleState::from(target).wire_name().to_string();
            snapshot
        }
    }
}

/// Decide what to do with a record whose pipeline could not be found
fn gone(prior: &PipelineRecord, reason: &str, mut diagnostics: Diagnostics) -> Outcome {
    if prior.removal_permitted() {
        info!("Removing pipeline {} from tracked state: {}", prior.id, reason);
        diagnostics.info(
            "pipeline removed from state",
            format!("pipeline {} is no longer available: {}", prior.id, reason),
        );
        Outcome::remove(diagnostics)
    } else {
        warn!("Pipeline {} unavailable, keeping record: {}", prior.id, reason);
        diagnostics.warning(
            "pipeline unavailable",
            format!(
                "pipeline {} could not be read ({}); keeping the last known record because allow_deletion is false",
                prior.id, reason
            ),
        );
        Outcome::unchanged(diagnostics)
    }
}

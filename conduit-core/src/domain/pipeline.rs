//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::state::DesiredRunState;
use crate::dto::pipeline::{PipelineSpec, ResourcesSpec, ServiceAccountSpec};

/// Tracked pipeline record
///
/// The unit persisted between operations. Some fields are remote-authoritative
/// (id, name, definition, url); others exist only on the client side
/// (connection target, deletion policy, timeouts, secrets). See
/// [`crate::merge`] for how the two are combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    #[serde(default)]
    pub id: String,
    /// Data-plane URL of the cluster hosting the pipeline
    #[serde(default)]
    pub cluster_api_url: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config_yaml: String,
    /// Declared run state on input, recorded state after a merge
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub resources: Option<Resources>,
    #[serde(default)]
    pub service_account: Option<ServiceAccount>,
    /// `None` and an empty map are distinct and must stay distinct
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub allow_deletion: Option<bool>,
    #[serde(default)]
    pub timeouts: Option<Timeouts>,
}

/// Resource sizing for a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub memory_shares: String,
    pub cpu_shares: String,
}

impl From<&ResourcesSpec> for Resources {
    fn from(spec: &ResourcesSpec) -> Self {
        Self {
            memory_shares: spec.memory_shares.clone(),
            cpu_shares: spec.cpu_shares.clone(),
        }
    }
}

impl From<&Resources> for ResourcesSpec {
    fn from(resources: &Resources) -> Self {
        Self {
            memory_shares: resources.memory_shares.clone(),
            cpu_shares: resources.cpu_shares.clone(),
        }
    }
}

/// Service account used by the pipeline to reach its cluster
///
/// `client_secret` and `secret_version` are write-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Bumped by the operator to force a secret rotation
    #[serde(default)]
    pub secret_version: Option<String>,
}

/// Which orchestrator operation a timeout applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Per-operation timeouts, in seconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default)]
    pub create: Option<u64>,
    #[serde(default)]
    pub update: Option<u64>,
    #[serde(default)]
    pub delete: Option<u64>,
}

impl Timeouts {
    /// Timeout for an operation, or `default` when none is configured
    pub fn for_operation(&self, op: Operation, default: Duration) -> Duration {
        let secs = match op {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        };
        secs.map(Duration::from_secs).unwrap_or(default)
    }
}

impl PipelineRecord {
    /// Whether the remote pipeline may be destroyed by a delete
    ///
    /// Only an explicit `allow_deletion = true` permits it.
    pub fn deletion_permitted(&self) -> bool {
        self.allow_deletion == Some(true)
    }

    /// Whether a vanished pipeline may be dropped from tracked state
    ///
    /// Unset counts as permissive here, unlike [`Self::deletion_permitted`].
    pub fn removal_permitted(&self) -> bool {
        self.allow_deletion.unwrap_or(true)
    }

    /// The run state the caller declared, if any
    pub fn desired_run_state(&self) -> Option<DesiredRunState> {
        DesiredRunState::parse(&self.state)
    }

    /// Timeout for `op`, falling back to `default`
    pub fn timeout(&self, op: Operation, default: Duration) -> Duration {
        self.timeouts
            .as_ref()
            .map(|t| t.for_operation(op, default))
            .unwrap_or(default)
    }

    /// Build the create/update request body from this record
    pub fn to_spec(&self) -> PipelineSpec {
        let service_account = self.service_account.as_ref().and_then(|sa| {
            match (&sa.client_id, &sa.client_secret) {
                (Some(client_id), Some(client_secret)) => Some(ServiceAccountSpec {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                }),
                _ => None,
            }
        });

        PipelineSpec {
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            config_yaml: self.config_yaml.clone(),
            resources: self.resources.as_ref().map(ResourcesSpec::from),
            service_account,
            tags: self.tags.clone().unwrap_or_default(),
        }
    }
}

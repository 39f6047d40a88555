//! Pipeline DTOs for the data-plane API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::state::LifecycleState;

/// The remote API's view of a pipeline at one instant
///
/// Secrets are never echoed back, and sizing or tags may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config_yaml: String,
    /// Wire state name, e.g. `STATE_RUNNING`
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<ServiceAccountRef>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl PipelineSnapshot {
    pub fn lifecycle_state(&self) -> LifecycleState {
        LifecycleState::decode(&self.state)
    }
}

/// Resource sizing as exchanged on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesSpec {
    #[serde(default)]
    pub memory_shares: String,
    #[serde(default)]
    pub cpu_shares: String,
}

/// Service account as reported by the API (id only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountRef {
    #[serde(default)]
    pub client_id: String,
}

/// Service account credentials sent on create/update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountSpec {
    pub client_id: String,
    pub client_secret: String,
}

/// Request body for creating or updating a pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub display_name: String,
    pub description: String,
    pub config_yaml: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<ServiceAccountSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Response wrapper used by every pipeline endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEnvelope {
    pub pipeline: PipelineSnapshot,
}

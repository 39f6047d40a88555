//! Record merge
//!
//! Rebuilds a complete [`PipelineRecord`] from a remote snapshot plus the
//! fields the remote API never returns. Field ownership:
//!
//! | Field                                      | Source                                              |
//! |--------------------------------------------|-----------------------------------------------------|
//! | id, display_name, description, config, url | snapshot, verbatim (empty is valid)                 |
//! | state                                      | prior if equivalent, else normalized snapshot state |
//! | resources                                  | planned if set, else snapshot                       |
//! | service_account                            | planned if set, else snapshot id only               |
//! | tags                                       | snapshot; empty map becomes `None`                  |
//! | cluster_api_url, allow_deletion, timeouts  | contingent only                                     |

use std::collections::BTreeMap;

use crate::domain::pipeline::{PipelineRecord, Resources, ServiceAccount, Timeouts};
use crate::domain::state::{LifecycleState, equivalent, normalize};
use crate::dto::pipeline::PipelineSnapshot;

/// Locally-authoritative fields carried across reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContingentFields {
    pub cluster_api_url: Option<String>,
    /// Previously recorded (or declared) state string
    pub prior_state: Option<String>,
    /// Planned sizing; `None` when unset or not yet known
    pub resources: Option<Resources>,
    /// Planned service account, including write-only secret material
    pub service_account: Option<ServiceAccount>,
    pub allow_deletion: Option<bool>,
    pub timeouts: Option<Timeouts>,
}

impl ContingentFields {
    /// Extract the contingent fields from a plan or a prior record
    pub fn from_record(record: &PipelineRecord) -> Self {
        Self {
            cluster_api_url: record.cluster_api_url.clone(),
            prior_state: Some(record.state.clone()).filter(|s| !s.is_empty()),
            resources: record.resources.clone(),
            service_account: record.service_account.clone(),
            allow_deletion: record.allow_deletion,
            timeouts: record.timeouts.clone(),
        }
    }
}

/// Decide the state string to record for an observation
///
/// Keeps `prior` verbatim when it is still operationally equivalent to what
/// was observed, otherwise records the normalized observation.
pub fn merge_state(prior: Option<&str>, observed: LifecycleState) -> String {
    match prior.filter(|p| !p.is_empty()) {
        Some(prior) if equivalent(prior, observed.as_str()) => prior.to_string(),
        _ => normalize(observed).as_str().to_string(),
    }
}

/// Merge a remote snapshot with the contingent fields into a full record
pub fn merge(snapshot: &PipelineSnapshot, contingent: &ContingentFields) -> PipelineRecord {
    let state = merge_state(
        contingent.prior_state.as_deref(),
        snapshot.lifecycle_state(),
    );

    let resources = contingent
        .resources
        .clone()
        .or_else(|| snapshot.resources.as_ref().map(Resources::from));

    let service_account = contingent.service_account.clone().or_else(|| {
        snapshot.service_account.as_ref().map(|sa| ServiceAccount {
            client_id: Some(sa.client_id.clone()),
            client_secret: None,
            secret_version: None,
        })
    });

    let tags: Option<BTreeMap<String, String>> =
        Some(snapshot.tags.clone()).filter(|tags| !tags.is_empty());

    PipelineRecord {
        id: snapshot.id.clone(),
        cluster_api_url: contingent.cluster_api_url.clone(),
        display_name: snapshot.display_name.clone(),
        description: snapshot.description.clone(),
        config_yaml: snapshot.config_yaml.clone(),
        state,
        url: snapshot.url.clone(),
        resources,
        service_account,
        tags,
        allow_deletion: contingent.allow_deletion,
        timeouts: contingent.timeouts.clone(),
    }
}

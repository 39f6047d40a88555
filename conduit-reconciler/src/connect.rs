//! Connection provisioning
//!
//! Turns a cluster's data-plane URL into a pipeline API handle, and resolves
//! a cluster id into that URL for imports. A handle belongs to one
//! orchestrator operation and is released when dropped.

use async_trait::async_trait;
use conduit_client::{ClientError, ClusterApi, DataplaneClient, PipelineApi};
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ReconcilerConfig;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid cluster API URL '{0}'")]
    InvalidEndpoint(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid import ID '{0}': expected <pipeline_id>,<cluster_id>")]
    InvalidImportId(String),

    #[error("cluster {cluster_id} not found as a dedicated cluster ({dedicated}) or a serverless cluster ({serverless})")]
    ClusterNotFound {
        cluster_id: String,
        dedicated: String,
        serverless: String,
    },
}

/// Produces pipeline API handles for a data-plane endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn PipelineApi>, ConnectError>;
}

/// Connects over HTTP with a bearer token and a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpConnector {
    token: Option<String>,
    request_timeout: Duration,
}

impl HttpConnector {
    pub fn new(token: Option<String>, request_timeout: Duration) -> Self {
        Self {
            token,
            request_timeout,
        }
    }

    pub fn from_config(config: &ReconcilerConfig) -> Self {
        Self::new(config.token.clone(), config.request_timeout)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn PipelineApi>, ConnectError> {
        let url = Url::parse(endpoint).map_err(|_| ConnectError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConnectError::InvalidEndpoint(endpoint.to_string()));
        }

        let http = Client::builder().timeout(self.request_timeout).build()?;
        let client = DataplaneClient::with_client(endpoint, http);
        let client = match &self.token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        };

        debug!("Opened data-plane connection to {}", endpoint);
        Ok(Box::new(client))
    }
}

/// Identifier pair accepted by import: `<pipeline_id>,<cluster_id>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub pipeline_id: String,
    pub cluster_id: String,
}

impl ImportId {
    pub fn parse(input: &str) -> Result<Self, ConnectError> {
        let parts: Vec<&str> = input.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [pipeline_id, cluster_id] if !pipeline_id.is_empty() && !cluster_id.is_empty() => {
                Ok(Self {
                    pipeline_id: pipeline_id.to_string(),
                    cluster_id: cluster_id.to_string(),
                })
            }
            _ => Err(ConnectError::InvalidImportId(input.to_string())),
        }
    }
}

/// Resolve a cluster id to its data-plane URL
///
/// Tries the dedicated-cluster lookup first and falls back to the serverless
/// lookup. A cluster found without a data-plane URL counts as not found.
pub async fn resolve_cluster_endpoint(
    clusters: &dyn ClusterApi,
    cluster_id: &str,
) -> Result<String, ConnectError> {
    let dedicated = match clusters.get_cluster(cluster_id).await {
        Ok(cluster) => match cluster.dataplane_url() {
            Some(url) => {
                info!("Resolved dedicated cluster {} to {}", cluster_id, url);
                return Ok(url.to_string());
            }
            None => "no data-plane API URL".to_string(),
        },
        Err(e) => describe(&e),
    };

    debug!(
        "Cluster {} is not a usable dedicated cluster ({}), trying serverless",
        cluster_id, dedicated
    );

    let serverless = match clusters.get_serverless_cluster(cluster_id).await {
        Ok(cluster) => match cluster.dataplane_url() {
            Some(url) => {
                info!("Resolved serverless cluster {} to {}", cluster_id, url);
                return Ok(url.to_string());
            }
            None => "no data-plane API URL".to_string(),
        },
        Err(e) => describe(&e),
    };

    Err(ConnectError::ClusterNotFound {
        cluster_id: cluster_id.to_string(),
        dedicated,
        serverless,
    })
}

fn describe(e: &ClientError) -> String {
    if e.is_not_found() {
        "not found".to_string()
    } else {
        e.to_string()
    }
}

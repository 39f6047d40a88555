//! Cluster lookup endpoints on the control plane

use async_trait::async_trait;
use conduit_core::dto::cluster::{Cluster, ClusterEnvelope};
use reqwest::Client;
use tracing::debug;

use crate::error::Result;
use crate::{authorize, handle_response, send};

/// Control-plane cluster lookups
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Look up a dedicated (BYOC or hosted) cluster
    async fn get_cluster(&self, id: &str) -> Result<Cluster>;

    /// Look up a serverless cluster
    async fn get_serverless_cluster(&self, id: &str) -> Result<Cluster>;
}

/// HTTP client for the control-plane API
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl ControlPlaneClient {
    /// Create a new control-plane client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new control-plane client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, url: String) -> Result<Cluster> {
        debug!("GET {}", url);
        let builder = authorize(self.client.get(&url), self.token.as_deref());
        let response = send(builder).await?;

        let envelope: ClusterEnvelope = handle_response(response).await?;
        Ok(envelope.cluster)
    }
}

#[async_trait]
impl ClusterApi for ControlPlaneClient {
    async fn get_cluster(&self, id: &str) -> Result<Cluster> {
        self.fetch(format!("{}/v1/clusters/{}", self.base_url, id))
            .await
    }

    async fn get_serverless_cluster(&self, id: &str) -> Result<Cluster> {
        self.fetch(format!("{}/v1/serverless/clusters/{}", self.base_url, id))
            .await
    }
}

//! Pipeline-related API endpoints

use async_trait::async_trait;
use conduit_core::dto::pipeline::{PipelineEnvelope, PipelineSnapshot, PipelineSpec};
use tracing::debug;

use crate::error::Result;
use crate::{DataplaneClient, handle_empty_response, handle_response, send};

/// Remote pipeline API consumed by the reconciler
///
/// Implementations must report a missing pipeline so that
/// [`crate::ClientError::is_not_found`] holds, and transport failures so that
/// [`crate::ClientError::is_unreachable`] holds.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Create a pipeline from its definition
    async fn create_pipeline(&self, spec: PipelineSpec) -> Result<PipelineSnapshot>;

    /// Fetch the current snapshot of a pipeline
    async fn get_pipeline(&self, id: &str) -> Result<PipelineSnapshot>;

    /// Replace the definition of a stopped pipeline
    async fn update_pipeline(&self, id: &str, spec: PipelineSpec) -> Result<PipelineSnapshot>;

    /// Delete a pipeline
    async fn delete_pipeline(&self, id: &str) -> Result<()>;

    /// Ask the remote side to start a pipeline; returns once accepted
    async fn start_pipeline(&self, id: &str) -> Result<()>;

    /// Ask the remote side to stop a pipeline; returns once accepted
    async fn stop_pipeline(&self, id: &str) -> Result<()>;
}

impl DataplaneClient {
    fn pipelines_url(&self) -> String {
        format!("{}/v1/redpanda-connect/pipelines", self.base_url)
    }

    fn pipeline_url(&self, id: &str) -> String {
        format!("{}/{}", self.pipelines_url(), id)
    }
}

#[async_trait]
impl PipelineApi for DataplaneClient {
    async fn create_pipeline(&self, spec: PipelineSpec) -> Result<PipelineSnapshot> {
        let url = self.pipelines_url();
        debug!("POST {}", url);
        let response = send(self.authorize(self.client.post(&url).json(&spec))).await?;

        let envelope: PipelineEnvelope = handle_response(response).await?;
        Ok(envelope.pipeline)
    }

    async fn get_pipeline(&self, id: &str) -> Result<PipelineSnapshot> {
        let url = self.pipeline_url(id);
        debug!("GET {}", url);
        let response = send(self.authorize(self.client.get(&url))).await?;

        let envelope: PipelineEnvelope = handle_response(response).await?;
        Ok(envelope.pipeline)
    }

    async fn update_pipeline(&self, id: &str, spec: PipelineSpec) -> Result<PipelineSnapshot> {
        let url = self.pipeline_url(id);
        debug!("PUT {}", url);
        let response = send(self.authorize(self.client.put(&url).json(&spec))).await?;

        let envelope: PipelineEnvelope = handle_response(response).await?;
        Ok(envelope.pipeline)
    }

    async fn delete_pipeline(&self, id: &str) -> Result<()> {
        let url = self.pipeline_url(id);
        debug!("DELETE {}", url);
        let response = send(self.authorize(self.client.delete(&url))).await?;

        handle_empty_response(response).await
    }

    async fn start_pipeline(&self, id: &str) -> Result<()> {
        let url = format!("{}/start", self.pipeline_url(id));
        debug!("PUT {}", url);
        let response = send(self.authorize(self.client.put(&url))).await?;

        handle_empty_response(response).await
    }

    async fn stop_pipeline(&self, id: &str) -> Result<()> {
        let url = format!("{}/stop", self.pipeline_url(id));
        debug!("PUT {}", url);
        let response = send(self.authorize(self.client.put(&url))).await?;

        handle_empty_response(response).await
    }
}

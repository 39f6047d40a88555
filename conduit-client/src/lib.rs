//! Conduit HTTP Clients
//!
//! Type-safe HTTP clients for the two remote APIs the reconciler talks to:
//! the data-plane pipeline API (one per cluster) and the control-plane
//! cluster API (used to resolve a cluster's data-plane URL on import).
//!
//! Both are exposed behind async traits ([`PipelineApi`], [`ClusterApi`]) so
//! the reconciler can be driven against in-memory fakes.
//!
//! # Example
//!
//! ```no_run
//! use conduit_client::{DataplaneClient, PipelineApi};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DataplaneClient::new("https://api.cluster.example.com");
//!
//!     let pipeline = client.get_pipeline("d0p1pel1ne").await?;
//!     println!("Pipeline {} is {}", pipeline.id, pipeline.lifecycle_state());
//!     Ok(())
//! }
//! ```

mod clusters;
pub mod error;
mod pipelines;

// Re-export commonly used types
pub use clusters::{ClusterApi, ControlPlaneClient};
pub use conduit_core::dto::pipeline::{PipelineSnapshot, PipelineSpec};
pub use error::{ClientError, Result};
pub use pipelines::PipelineApi;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for a cluster's data-plane pipeline API
///
/// One instance is bound to one cluster endpoint. Pipeline endpoints live
/// under `/v1/redpanda-connect/pipelines`.
#[derive(Debug, Clone)]
pub struct DataplaneClient {
    /// Base URL of the data-plane API (e.g., "https://api.cluster.example.com")
    base_url: String,
    /// Bearer token sent with every request, if any
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl DataplaneClient {
    /// Create a new data-plane client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the data-plane API
    ///
    /// # Example
    /// ```
    /// use conduit_client::DataplaneClient;
    ///
    /// let client = DataplaneClient::new("https://api.cluster.example.com");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new data-plane client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use conduit_client::DataplaneClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = DataplaneClient::with_client("https://api.cluster.example.com", http_client);
    /// ```
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

    /// Get the base URL of the data-plane API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        authorize(builder, self.token.as_deref())
    }
}

// =============================================================================
// Response Handlers
// =============================================================================

pub(crate) fn authorize(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Send a request, classifying transport failures
pub(crate) async fn send(builder: RequestBuilder) -> Result<reqwest::Response> {
    builder.send().await.map_err(|e| {
        if e.is_connect() {
            ClientError::Unreachable(e.to_string())
        } else {
            ClientError::RequestFailed(e)
        }
    })
}

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response whose body is ignored (start, stop, delete)
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DataplaneClient::new("https://api.cluster.example.com");
        assert_eq!(client.base_url(), "https://api.cluster.example.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = DataplaneClient::new("https://api.cluster.example.com/");
        assert_eq!(client.base_url(), "https://api.cluster.example.com");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = DataplaneClient::with_client("https://api.cluster.example.com", http_client)
            .with_token("t0ken");
        assert_eq!(client.base_url(), "https://api.cluster.example.com");
        assert_eq!(client.token.as_deref(), Some("t0ken"));
    }
}

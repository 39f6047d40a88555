//! Cluster DTOs for the control-plane API
//!
//! Only the data-plane endpoint is of interest: it is the connection target
//! a pipeline lives behind.

use serde::{Deserialize, Serialize};

/// A dedicated or serverless cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dataplane_api: Option<DataplaneApi>,
}

impl Cluster {
    /// The data-plane URL, if the cluster reports a non-empty one
    pub fn dataplane_url(&self) -> Option<&str> {
        self.dataplane_api
            .as_ref()
            .map(|api| api.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataplaneApi {
    #[serde(default)]
    pub url: String,
}

/// Response wrapper for the cluster lookup endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEnvelope {
    pub cluster: Cluster,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataplane_url() {
        let cluster: Cluster = serde_json::from_str(
            r#"{"id": "c-1", "dataplane_api": {"url": "https://api.c-1.example.com"}}"#,
        )
        .unwrap();
        assert_eq!(cluster.dataplane_url(), Some("https://api.c-1.example.com"));
    }

    #[test]
    fn test_dataplane_url_missing_or_empty() {
        let cluster: Cluster = serde_json::from_str(r#"{"id": "c-1"}"#).unwrap();
        assert_eq!(cluster.dataplane_url(), None);

        let cluster: Cluster =
            serde_json::from_str(r#"{"id": "c-1", "dataplane_api": {"url": ""}}"#).unwrap();
        assert_eq!(cluster.dataplane_url(), None);
    }
}

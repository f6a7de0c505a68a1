//! Cluster API client
//!
//! A small HTTP client for the handful of cluster API calls the server makes:
//! reading activity records, listing executions and pods, and following
//! container logs.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::Config;

/// Errors that can occur when talking to the cluster API
#[derive(Debug, Error)]
pub enum KubeError {
    /// HTTP request failed
    #[error("cluster request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("cluster API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response
    #[error("failed to parse cluster response: {0}")]
    ParseError(String),

    /// Failed to read credentials from disk
    #[error("failed to read {path}: {source}")]
    Credentials {
        path: String,
        source: std::io::Error,
    },
}

impl KubeError {
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::ApiError {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if the API rejected the request, e.g. a container not started yet
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::ApiError { status: 400, .. })
    }
}

pub type Result<T> = std::result::Result<T, KubeError>;

/// HTTP client for the cluster API
#[derive(Debug, Clone)]
pub struct KubeClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl KubeClient {
    /// Create a client without credentials, e.g. for a local API proxy
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, None, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, token: Option<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    /// Create a client from server configuration
    ///
    /// Reads the bearer token and the CA bundle when they are configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = match &config.kube_token_file {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .map_err(|source| KubeError::Credentials {
                        path: path.display().to_string(),
                        source,
                    })?
                    .trim()
                    .to_string(),
            ),
            None => None,
        };

        let mut builder = Client::builder();
        if let Some(path) = &config.kube_ca_file {
            let pem = std::fs::read(path).map_err(|source| KubeError::Credentials {
                path: path.display().to_string(),
                source,
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self::with_client(
            config.kube_api_url.clone(),
            token,
            builder.build()?,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.get(&url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET a resource and deserialize it
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self.get(path).query(query).send().await?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| KubeError::ParseError(format!("{}: {}", path, e)))
    }

    /// GET a resource and hand back the response for streaming its body
    pub async fn get_stream(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let response = self.get(path).query(query).send().await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(KubeError::api_error(status, error_text));
    }

    Ok(response)
}

// =============================================================================
// API Paths
// =============================================================================

pub fn activity_path(namespace: &str, name: &str) -> String {
    format!(
        "/apis/jenkins.io/v1/namespaces/{}/pipelineactivities/{}",
        namespace, name
    )
}

pub fn pipeline_runs_path(namespace: &str) -> String {
    format!("/apis/tekton.dev/v1/namespaces/{}/pipelineruns", namespace)
}

pub fn pipeline_run_path(namespace: &str, name: &str) -> String {
    format!("{}/{}", pipeline_runs_path(namespace), name)
}

pub fn pods_path(namespace: &str) -> String {
    format!("/api/v1/namespaces/{}/pods", namespace)
}

pub fn pod_path(namespace: &str, name: &str) -> String {
    format!("{}/{}", pods_path(namespace), name)
}

pub fn pod_log_path(namespace: &str, name: &str) -> String {
    format!("{}/log", pod_path(namespace, name))
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Object {
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRun {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: Option<ConditionedStatus>,
}

impl PipelineRun {
    /// Whether the run reached a final Succeeded condition, true or false
    pub fn is_finished(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.iter().find(|c| c.kind == "Succeeded"))
            .is_some_and(|condition| condition.status != "Unknown")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConditionedStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pod {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    pub fn is_pending(&self) -> bool {
        matches!(self.status.phase.as_deref(), None | Some("Pending"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: Option<String>,
}

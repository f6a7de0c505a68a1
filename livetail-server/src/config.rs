//! Server configuration
//!
//! Defines all configurable parameters for the live-log server including
//! the listen address, cluster connection settings and per-viewer limits.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const DEFAULT_CA_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Longest accepted wait for a pod or container to start
const MAX_POD_START_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Namespace used when a request does not name one
    pub default_namespace: String,

    /// Cluster API base URL
    pub kube_api_url: String,

    /// File holding the bearer token for the cluster API
    pub kube_token_file: Option<PathBuf>,

    /// PEM bundle trusted for the cluster API
    pub kube_ca_file: Option<PathBuf>,

    /// Events buffered per viewer before the session waits on the client
    pub event_buffer: usize,

    /// Maximum number of concurrently connected viewers
    pub max_connections: usize,

    /// How often pods and executions are polled while tailing
    pub pod_poll_interval: Duration,

    /// How long a pod or container may stay pending before tailing gives up
    pub pod_start_timeout: Duration,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - LIVETAIL_BIND_ADDR (default: 0.0.0.0:8080)
    /// - LIVETAIL_DEFAULT_NAMESPACE (default: jx)
    /// - KUBE_API_URL (default: https://kubernetes.default.svc)
    /// - KUBE_TOKEN_FILE (default: service account token, if present)
    /// - KUBE_CA_FILE (default: service account CA, if present)
    /// - LIVETAIL_EVENT_BUFFER (default: 256)
    /// - LIVETAIL_MAX_CONNECTIONS (default: 512)
    /// - LIVETAIL_POD_POLL_INTERVAL (seconds, default: 2)
    /// - LIVETAIL_POD_START_TIMEOUT (seconds, default: 300)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("LIVETAIL_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let default_namespace =
            std::env::var("LIVETAIL_DEFAULT_NAMESPACE").unwrap_or(defaults.default_namespace);

        let kube_api_url = std::env::var("KUBE_API_URL").unwrap_or(defaults.kube_api_url);

        let kube_token_file = std::env::var("KUBE_TOKEN_FILE")
            .ok()
            .map(PathBuf::from)
            .or(defaults.kube_token_file);

        let kube_ca_file = std::env::var("KUBE_CA_FILE")
            .ok()
            .map(PathBuf::from)
            .or(defaults.kube_ca_file);

        let event_buffer = parse_env("LIVETAIL_EVENT_BUFFER")?.unwrap_or(defaults.event_buffer);

        let max_connections =
            parse_env("LIVETAIL_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections);

        let pod_poll_interval = parse_env("LIVETAIL_POD_POLL_INTERVAL")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.pod_poll_interval);

        let pod_start_timeout = parse_env("LIVETAIL_POD_START_TIMEOUT")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.pod_start_timeout);

        Ok(Self {
            bind_addr,
            default_namespace,
            kube_api_url,
            kube_token_file,
            kube_ca_file,
            event_buffer,
            max_connections,
            pod_poll_interval,
            pod_start_timeout,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.default_namespace.is_empty() {
            anyhow::bail!("default_namespace cannot be empty");
        }

        if !self.kube_api_url.starts_with("http://") && !self.kube_api_url.starts_with("https://")
        {
            anyhow::bail!("kube_api_url must start with http:// or https://");
        }

        if self.event_buffer == 0 {
            anyhow::bail!("event_buffer must be greater than 0");
        }

        if self.max_connections == 0 {
            anyhow::bail!("max_connections must be greater than 0");
        }

        if self.pod_poll_interval.is_zero() {
            anyhow::bail!("pod_poll_interval must be greater than 0");
        }

        if self.pod_start_timeout > MAX_POD_START_TIMEOUT {
            anyhow::bail!(
                "pod_start_timeout cannot exceed {} seconds",
                MAX_POD_START_TIMEOUT.as_secs()
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            default_namespace: "jx".to_string(),
            kube_api_url: "https://kubernetes.default.svc".to_string(),
            kube_token_file: existing_file(DEFAULT_TOKEN_FILE),
            kube_ca_file: existing_file(DEFAULT_CA_FILE),
            event_buffer: 256,
            max_connections: 512,
            pod_poll_interval: Duration::from_secs(2),
            pod_start_timeout: Duration::from_secs(300),
        }
    }
}

fn existing_file(path: &str) -> Option<PathBuf> {
    let path = PathBuf::from(path);
    path.exists().then_some(path)
}

fn parse_env<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

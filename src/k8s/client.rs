//! Backend client with lazy initialization and synthetic fallback.
//!
//! The client resolves its configuration and connects on first use, exactly
//! once, no matter how many requests race to trigger it. Afterwards every
//! operation either answers from the live cluster or, on any failure,
//! substitutes the synthetic backend's answer. Callers never see an error.
//!
//! # Example
//!
//! ```ignore
//! use k8s_mcp::config::ConfigResolver;
//! use k8s_mcp::k8s::{BackendClient, KubeConnector, LogOptions};
//!
//! let client = BackendClient::new(ConfigResolver::builder().build(), KubeConnector::new());
//!
//! let pod = client.describe_pod("web-0", None).await;
//! if pod.is_synthetic() {
//!     tracing::warn!("cluster unreachable");
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, LogParams};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::synthetic::SyntheticBackend;
use super::{KubeResult, LogOptions, Sourced};
use crate::config::{BackendConfig, ConfigResolver};
use crate::error::KubeError;

/// Read operations against a live cluster.
///
/// Implementations return raw Kubernetes JSON so payloads pass through to
/// callers unchanged.
pub trait ClusterApi: Send + Sync {
    /// Lists pods in `namespace`, or across all namespaces when `None`.
    fn list_pods<'a>(
        &'a self,
        namespace: Option<&'a str>,
        selector: Option<&'a str>,
    ) -> BoxFuture<'a, KubeResult<Value>>;

    /// Fetches one pod.
    fn describe_pod<'a>(
        &'a self,
        name: &'a str,
        namespace: &'a str,
    ) -> BoxFuture<'a, KubeResult<Value>>;

    /// Fetches container logs for one pod.
    fn pod_logs<'a>(
        &'a self,
        name: &'a str,
        namespace: &'a str,
        options: &'a LogOptions,
    ) -> BoxFuture<'a, KubeResult<String>>;
}

/// Builds a [`ClusterApi`] from a resolved configuration.
pub trait Connector: Send + Sync {
    /// Connects to the cluster described by `config`.
    fn connect<'a>(
        &'a self,
        config: &'a BackendConfig,
    ) -> BoxFuture<'a, KubeResult<Arc<dyn ClusterApi>>>;
}

/// [`Connector`] backed by the `kube` crate.
#[derive(Debug, Clone, Default)]
pub struct KubeConnector {
    read_timeout: Option<Duration>,
}

impl KubeConnector {
    /// Creates a connector using kube's default timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the per-request read timeout.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Connector for KubeConnector {
    fn connect<'a>(
        &'a self,
        config: &'a BackendConfig,
    ) -> BoxFuture<'a, KubeResult<Arc<dyn ClusterApi>>> {
        async move {
            let uri = config
                .api_server
                .parse::<http::Uri>()
                .map_err(|e| KubeError::InvalidUrl {
                    url: config.api_server.clone(),
                    reason: e.to_string(),
                })?;

            let mut kube_config = kube::Config::new(uri);
            kube_config.default_namespace.clone_from(&config.namespace);
            kube_config.accept_invalid_certs = true;
            if self.read_timeout.is_some() {
                kube_config.read_timeout = self.read_timeout;
            }

            let client = kube::Client::try_from(kube_config).map_err(KubeError::ClientBuild)?;
            debug!(api_server = %config.api_server, "kube client constructed");

            Ok(Arc::new(KubeApi { client }) as Arc<dyn ClusterApi>)
        }
        .boxed()
    }
}

/// [`ClusterApi`] over a connected `kube::Client`.
struct KubeApi {
    client: kube::Client,
}

impl KubeApi {
    fn pods(&self, namespace: Option<&str>) -> Api<Pod> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

impl ClusterApi for KubeApi {
    fn list_pods<'a>(
        &'a self,
        namespace: Option<&'a str>,
        selector: Option<&'a str>,
    ) -> BoxFuture<'a, KubeResult<Value>> {
        async move {
            let mut params = ListParams::default();
            if let Some(selector) = selector {
                params = params.labels(selector);
            }

            let pods = self
                .pods(namespace)
                .list(&params)
                .await
                .map_err(|source| KubeError::Api {
                    operation: "list_pods",
                    source,
                })?;

            Ok(serde_json::to_value(&pods)?)
        }
        .boxed()
    }

    fn describe_pod<'a>(
        &'a self,
        name: &'a str,
        namespace: &'a str,
    ) -> BoxFuture<'a, KubeResult<Value>> {
        async move {
            let pod = self
                .pods(Some(namespace))
                .get(name)
                .await
                .map_err(|source| KubeError::Api {
                    operation: "describe_pod",
                    source,
                })?;

            Ok(serde_json::to_value(&pod)?)
        }
        .boxed()
    }

    fn pod_logs<'a>(
        &'a self,
        name: &'a str,
        namespace: &'a str,
        options: &'a LogOptions,
    ) -> BoxFuture<'a, KubeResult<String>> {
        async move {
            let params = LogParams {
                container: options.container.clone(),
                tail_lines: options.tail_lines,
                previous: options.previous,
                ..LogParams::default()
            };

            self.pods(Some(namespace))
                .logs(name, &params)
                .await
                .map_err(|source| KubeError::Api {
                    operation: "pod_logs",
                    source,
                })
        }
        .boxed()
    }
}

/// Outcome of the one-time initialization.
struct BackendState {
    config: BackendConfig,
    live: Option<Arc<dyn ClusterApi>>,
}

/// Cluster client that degrades to synthetic data instead of failing.
pub struct BackendClient {
    resolver: ConfigResolver,
    connector: Arc<dyn Connector>,
    synthetic: SyntheticBackend,
    state: OnceCell<BackendState>,
}

impl BackendClient {
    /// Creates an uninitialized client. Nothing is resolved or connected
    /// until the first operation.
    pub fn new(resolver: ConfigResolver, connector: impl Connector + 'static) -> Self {
        Self {
            resolver,
            connector: Arc::new(connector),
            synthetic: SyntheticBackend::new(),
            state: OnceCell::new(),
        }
    }

    /// Runs initialization if it has not happened yet; concurrent callers
    /// all wait on the same attempt.
    async fn state(&self) -> &BackendState {
        self.state
            .get_or_init(|| async {
                let config = self.resolver.resolve();
                info!(
                    api_server = %config.api_server,
                    namespace = %config.namespace,
                    "initializing kubernetes backend"
                );

                let attempt = AssertUnwindSafe(self.connector.connect(&config))
                    .catch_unwind()
                    .await;

                let live = match attempt {
                    Ok(Ok(api)) => {
                        info!("kubernetes backend ready");
                        Some(api)
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "failed to initialize kubernetes client, using synthetic data");
                        None
                    }
                    Err(_) => {
                        warn!("kubernetes client initialization panicked, using synthetic data");
                        None
                    }
                };

                BackendState { config, live }
            })
            .await
    }

    /// Returns `true` once initialization has failed. Initializes first if
    /// needed.
    pub async fn is_degraded(&self) -> bool {
        self.state().await.live.is_none()
    }

    /// Returns `true` once initialization has run, successfully or not.
    pub fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    /// The resolved configuration, if initialization has run.
    pub fn config(&self) -> Option<&BackendConfig> {
        self.state.get().map(|state| &state.config)
    }

    /// The namespace used when a call names none. Initializes first if
    /// needed.
    pub async fn default_namespace(&self) -> &str {
        &self.state().await.config.namespace
    }

    /// Lists pods. `namespace = None` or a blank namespace lists across all
    /// namespaces.
    pub async fn list_pods(&self, namespace: Option<&str>, selector: Option<&str>) -> Sourced<Value> {
        let state = self.state().await;
        let namespace = non_blank(namespace);
        let Some(api) = &state.live else {
            return Sourced::Synthetic(self.synthetic.list_pods(namespace));
        };

        match api.list_pods(namespace, selector).await {
            Ok(pods) => Sourced::Live(pods),
            Err(e) => {
                error!(error = %e, "error listing pods, using synthetic data");
                Sourced::Synthetic(self.synthetic.list_pods(namespace))
            }
        }
    }

    /// Fetches one pod. `namespace = None` or a blank namespace uses the
    /// resolved default namespace.
    pub async fn describe_pod(&self, name: &str, namespace: Option<&str>) -> Sourced<Value> {
        let state = self.state().await;
        let namespace = non_blank(namespace).unwrap_or(&state.config.namespace);
        let Some(api) = &state.live else {
            return Sourced::Synthetic(self.synthetic.describe_pod(name, namespace));
        };

        match api.describe_pod(name, namespace).await {
            Ok(pod) => Sourced::Live(pod),
            Err(e) => {
                error!(pod = name, namespace, error = %e, "error describing pod, using synthetic data");
                Sourced::Synthetic(self.synthetic.describe_pod(name, namespace))
            }
        }
    }

    /// Fetches container logs. Namespace defaults as in
    /// [`describe_pod`](Self::describe_pod).
    pub async fn pod_logs(
        &self,
        name: &str,
        namespace: Option<&str>,
        options: &LogOptions,
    ) -> Sourced<String> {
        let state = self.state().await;
        let namespace = non_blank(namespace).unwrap_or(&state.config.namespace);
        let Some(api) = &state.live else {
            return Sourced::Synthetic(self.synthetic.pod_logs(name, namespace, options));
        };

        match api.pod_logs(name, namespace, options).await {
            Ok(logs) => Sourced::Live(logs),
            Err(e) => {
                error!(pod = name, namespace, error = %e, "error getting pod logs, using synthetic data");
                Sourced::Synthetic(self.synthetic.pod_logs(name, namespace, options))
            }
        }
    }
}

fn non_blank(namespace: Option<&str>) -> Option<&str> {
    namespace.filter(|ns| !ns.trim().is_empty())
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("config", &self.config())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

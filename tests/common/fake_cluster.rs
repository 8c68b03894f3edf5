//! In-memory stand-ins for the cluster API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use k8s_mcp::config::BackendConfig;
use k8s_mcp::error::KubeError;
use k8s_mcp::k8s::{ClusterApi, Connector, KubeResult, LogOptions};
use serde_json::{Value, json};

/// A cluster holding a fixed set of pods.
#[derive(Clone, Default)]
pub struct FakeCluster {
    pods: Arc<Vec<Value>>,
    logs: Arc<String>,
    failing: Arc<AtomicBool>,
    panicking: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FakeCluster {
    pub fn new(pods: Vec<Value>) -> Self {
        Self {
            pods: Arc::new(pods),
            logs: Arc::new("line one\nline two\nline three".to_string()),
            ..Self::default()
        }
    }

    /// Makes every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every following call panic.
    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Number of API calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, operation: &'static str) -> KubeResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(
            !self.panicking.load(Ordering::SeqCst),
            "fake cluster panicked in {operation}"
        );
        if self.failing.load(Ordering::SeqCst) {
            return Err(api_error(operation, 503, "ServiceUnavailable"));
        }
        Ok(())
    }
}

impl ClusterApi for FakeCluster {
    fn list_pods<'a>(
        &'a self,
        namespace: Option<&'a str>,
        selector: Option<&'a str>,
    ) -> BoxFuture<'a, KubeResult<Value>> {
        async move {
            self.enter("list_pods")?;
            let items: Vec<Value> = self
                .pods
                .iter()
                .filter(|pod| namespace.is_none_or(|ns| pod["metadata"]["namespace"] == ns))
                .filter(|pod| selector.is_none_or(|s| matches_selector(pod, s)))
                .cloned()
                .collect();
            Ok(json!({ "kind": "PodList", "apiVersion": "v1", "metadata": {}, "items": items }))
        }
        .boxed()
    }

    fn describe_pod<'a>(
        &'a self,
        name: &'a str,
        namespace: &'a str,
    ) -> BoxFuture<'a, KubeResult<Value>> {
        async move {
            self.enter("describe_pod")?;
            self.pods
                .iter()
                .find(|pod| {
                    pod["metadata"]["name"] == name && pod["metadata"]["namespace"] == namespace
                })
                .cloned()
                .ok_or_else(|| api_error("describe_pod", 404, "NotFound"))
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
            self.enter("pod_logs")?;
            if !self.pods.iter().any(|pod| {
                pod["metadata"]["name"] == name && pod["metadata"]["namespace"] == namespace
            }) {
                return Err(api_error("pod_logs", 404, "NotFound"));
            }
            let lines: Vec<&str> = self.logs.lines().collect();
            let keep = options
                .tail_lines
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(lines.len());
            Ok(lines[lines.len().saturating_sub(keep)..].join("\n"))
        }
        .boxed()
    }
}

/// Supports `key=value` selectors joined by commas.
fn matches_selector(pod: &Value, selector: &str) -> bool {
    selector.split(',').all(|term| match term.split_once('=') {
        Some((key, value)) => pod["metadata"]["labels"][key.trim()] == value.trim(),
        None => false,
    })
}

fn api_error(operation: &'static str, code: u16, reason: &str) -> KubeError {
    KubeError::Api {
        operation,
        source: kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("fake cluster: {reason}"),
            reason: reason.to_string(),
            code,
        }),
    }
}

/// A connector that counts attempts and hands out a [`FakeCluster`], or
/// fails when built without one.
#[derive(Clone, Default)]
pub struct FakeConnector {
    cluster: Option<FakeCluster>,
    delay: Duration,
    attempts: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn to(cluster: FakeCluster) -> Self {
        Self {
            cluster: Some(cluster),
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self::default()
    }

    /// Sleeps this long inside every connect attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn connect<'a>(
        &'a self,
        config: &'a BackendConfig,
    ) -> BoxFuture<'a, KubeResult<Arc<dyn ClusterApi>>> {
        async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.cluster {
                Some(cluster) => Ok(Arc::new(cluster.clone()) as Arc<dyn ClusterApi>),
                None => Err(KubeError::InvalidUrl {
                    url: config.api_server.clone(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
        .boxed()
    }
}

//! Deterministic stand-in for the cluster API.
//!
//! Used whenever the live backend is unavailable. Stateless and infallible;
//! the same inputs always produce byte-identical payloads.

use serde_json::{Value, json};

use super::LogOptions;
use crate::config::DEFAULT_NAMESPACE;

/// Name of the pod returned by [`SyntheticBackend::list_pods`].
pub const SYNTHETIC_POD_NAME: &str = "mock-pod";

/// Name of the single container in every synthetic pod.
pub const SYNTHETIC_CONTAINER_NAME: &str = "mock-container";

/// Fixed creation time so output is stable across calls.
const SYNTHETIC_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

const SYNTHETIC_POD_IP: &str = "10.0.0.1";

const SYNTHETIC_LOGS: &str =
    "Mock pod logs\nThis is a simulated log output\nEverything is running fine";

/// Synthetic backend returning one fixed, healthy pod.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticBackend;

impl SyntheticBackend {
    /// Creates the synthetic backend.
    pub fn new() -> Self {
        Self
    }

    /// Returns a pod list holding a single running pod.
    pub fn list_pods(&self, namespace: Option<&str>) -> Value {
        let pod = pod(SYNTHETIC_POD_NAME, namespace.unwrap_or(DEFAULT_NAMESPACE), false);
        json!({
            "kind": "PodList",
            "apiVersion": "v1",
            "metadata": { "resourceVersion": "1" },
            "items": [pod],
        })
    }

    /// Returns a running pod carrying the requested name and namespace.
    pub fn describe_pod(&self, name: &str, namespace: &str) -> Value {
        pod(name, namespace, true)
    }

    /// Returns a fixed multi-line log, honoring `tail_lines`.
    pub fn pod_logs(&self, _name: &str, _namespace: &str, options: &LogOptions) -> String {
        match options.tail_lines.and_then(|n| usize::try_from(n).ok()) {
            Some(n) => {
                let lines: Vec<&str> = SYNTHETIC_LOGS.lines().collect();
                lines[lines.len().saturating_sub(n)..].join("\n")
            }
            None => SYNTHETIC_LOGS.to_string(),
        }
    }
}

fn pod(name: &str, namespace: &str, with_conditions: bool) -> Value {
    let mut status = json!({
        "phase": "Running",
        "containerStatuses": [{
            "name": SYNTHETIC_CONTAINER_NAME,
            "ready": true,
            "restartCount": 0,
            "state": { "running": { "startedAt": SYNTHETIC_TIMESTAMP } },
        }],
        "podIP": SYNTHETIC_POD_IP,
    });

    if with_conditions {
        status["conditions"] = json!([{
            "type": "Ready",
            "status": "True",
            "lastTransitionTime": SYNTHETIC_TIMESTAMP,
            "reason": "MockReady",
            "message": "Mock pod is ready",
        }]);
    }

    json!({
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": SYNTHETIC_TIMESTAMP,
        },
        "spec": {
            "containers": [{
                "name": SYNTHETIC_CONTAINER_NAME,
                "image": "mock-image:latest",
            }],
        },
        "status": status,
    })
}

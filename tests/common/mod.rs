//! Common test helpers and utilities.

#![allow(dead_code)]

pub mod fake_cluster;

use std::sync::Arc;

use k8s_mcp::config::ConfigResolver;
use k8s_mcp::k8s::BackendClient;
use k8s_mcp::mcp::Dispatcher;
use serde_json::{Value, json};

// Re-export for convenience
pub use fake_cluster::{FakeCluster, FakeConnector};

/// A dispatcher whose backend can never connect.
pub fn degraded_dispatcher() -> Dispatcher {
    let backend = BackendClient::new(ConfigResolver::defaults_only(), FakeConnector::refusing());
    Dispatcher::new(Arc::new(backend))
}

/// A dispatcher backed by `cluster`.
pub fn live_dispatcher(cluster: FakeCluster) -> Dispatcher {
    let backend = BackendClient::new(ConfigResolver::defaults_only(), FakeConnector::to(cluster));
    Dispatcher::new(Arc::new(backend))
}

/// Builds a JSON-RPC request message.
pub fn request(method: &str, params: Value, id: Value) -> Value {
    json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": id })
}

/// A pod object in the shape the API server returns.
pub fn pod(name: &str, namespace: &str, app: &str, phase: &str) -> Value {
    json!({
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": { "app": app },
            "creationTimestamp": "2024-05-01T12:00:00Z",
        },
        "spec": {
            "nodeName": "node-a",
            "containers": [{ "name": app, "image": format!("{app}:1.0") }],
        },
        "status": {
            "phase": phase,
            "podIP": "10.244.0.12",
            "containerStatuses": [{
                "name": app,
                "ready": phase == "Running",
                "restartCount": 0,
                "state": { "running": { "startedAt": "2024-05-01T12:00:05Z" } },
            }],
        },
    })
}

/// A small cluster: two web pods in `prod`, one pending worker in `batch`.
pub fn sample_cluster() -> FakeCluster {
    FakeCluster::new(vec![
        pod("web-0", "prod", "web", "Running"),
        pod("web-1", "prod", "web", "Running"),
        pod("worker-0", "batch", "worker", "Pending"),
    ])
}

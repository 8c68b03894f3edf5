//! Tool parameter types and the static tool catalog.
//!
//! Each tool maps one-to-one onto a dispatcher method of the same name. The
//! `parameters` field of a descriptor is the JSON Schema of the tool's
//! parameter struct.
//!
//! # Available Tools
//!
//! - `get_pod_status` - List pods, optionally filtered by namespace and labels
//! - `describe_pod` - Fetch one pod's full object
//! - `get_pod_logs` - Fetch container logs for one pod

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input for `get_pod_status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PodStatusParams {
    /// Namespace to list pods from.
    #[schemars(description = "Namespace to list pods from; all namespaces when omitted")]
    pub namespace: Option<String>,
    /// Label selector, e.g. app=web,tier!=cache.
    #[schemars(description = "Label selector, e.g. app=web,tier!=cache")]
    pub selector: Option<String>,
}

/// Input for `describe_pod`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DescribePodParams {
    /// Name of the pod.
    #[schemars(description = "Name of the pod")]
    pub pod_name: String,
    /// Namespace of the pod (default: "default").
    #[schemars(description = "Namespace of the pod (default: \"default\")")]
    pub namespace: Option<String>,
}

/// Input for `get_pod_logs`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PodLogsParams {
    /// Name of the pod.
    #[schemars(description = "Name of the pod")]
    pub pod_name: String,
    /// Namespace of the pod (default: "default").
    #[schemars(description = "Namespace of the pod (default: \"default\")")]
    pub namespace: Option<String>,
    /// Container name.
    #[schemars(description = "Container name; required only for multi-container pods")]
    pub container: Option<String>,
    /// Number of lines from the end of the log to return.
    #[schemars(description = "Number of lines from the end of the log to return")]
    pub tail_lines: Option<i64>,
    /// Return logs of the previous terminated container instance.
    #[schemars(description = "Return logs of the previous terminated container instance")]
    pub previous: Option<bool>,
}

/// Describes one tool in the `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Tool name, equal to its dispatcher method.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// JSON Schema of the parameters.
    pub parameters: Value,
}

impl ToolDescriptor {
    fn new<P: JsonSchema>(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            parameters: schema_for!(P).to_value(),
        }
    }
}

/// Returns the tool catalog in a fixed order.
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new::<PodStatusParams>("get_pod_status", "Get Kubernetes pod status"),
        ToolDescriptor::new::<DescribePodParams>("describe_pod", "Describe Kubernetes pod"),
        ToolDescriptor::new::<PodLogsParams>("get_pod_logs", "Get Kubernetes pod logs"),
    ]
}

//! Human-readable rendering for the auxiliary HTTP routes.
//!
//! Works on the raw pod JSON so it renders live and synthetic payloads the
//! same way. Output is Markdown meant for LLM consumption.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::{Padding, Style};

/// One row of the pod status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRow {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Ready containers over total, e.g. `1/2`.
    pub ready: String,
    /// Displayed status.
    pub status: String,
    /// Restarts summed over containers.
    pub restarts: u64,
    /// Age in `kubectl` short form.
    pub age: String,
    /// Pod IP.
    pub ip: String,
    /// Node the pod is scheduled on.
    pub node: String,
}

impl PodRow {
    /// Builds a row from a pod object.
    pub fn from_pod(pod: &Value, now: DateTime<Utc>) -> Self {
        let statuses = pod["status"]["containerStatuses"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();
        let total = pod["spec"]["containers"]
            .as_array()
            .map_or(statuses.len(), Vec::len);
        let ready = statuses
            .iter()
            .filter(|s| s["ready"].as_bool() == Some(true))
            .count();
        let restarts = statuses
            .iter()
            .filter_map(|s| s["restartCount"].as_u64())
            .sum();

        Self {
            namespace: text(&pod["metadata"]["namespace"]),
            name: text(&pod["metadata"]["name"]),
            ready: format!("{ready}/{total}"),
            status: pod_status(pod),
            restarts,
            age: pod["metadata"]["creationTimestamp"]
                .as_str()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map_or_else(|| "<unknown>".to_string(), |created| {
                    human_age(now.signed_duration_since(created.with_timezone(&Utc)))
                }),
            ip: text(&pod["status"]["podIP"]),
            node: text(&pod["spec"]["nodeName"]),
        }
    }

    /// Returns `true` unless the pod is running or has completed.
    pub fn is_problem(&self) -> bool {
        !matches!(self.status.as_str(), "Running" | "Completed" | "Succeeded")
    }
}

/// A pod that needs attention, with whatever detail could be gathered.
#[derive(Debug, Clone)]
pub struct ProblemPod {
    /// The pod's table row.
    pub row: PodRow,
    /// Rendered conditions, if the pod could be described.
    pub details: Option<String>,
}

/// Builds table rows from a pod list, optionally keeping only `pod_name`.
pub fn pod_rows(list: &Value, pod_name: Option<&str>, now: DateTime<Utc>) -> Vec<PodRow> {
    list["items"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|pod| PodRow::from_pod(pod, now))
        .filter(|row| pod_name.is_none_or(|name| row.name == name))
        .collect()
}

/// Renders the status table, a per-status summary and the problem pods.
pub fn status_report(rows: &[PodRow], show_namespace: bool, problems: &[ProblemPod]) -> String {
    if rows.is_empty() {
        return "No resources found.".to_string();
    }

    let mut header = vec!["NAME", "READY", "STATUS", "RESTARTS", "AGE", "IP", "NODE"];
    if show_namespace {
        header.insert(0, "NAMESPACE");
    }
    let mut table: Vec<Vec<String>> = vec![header.iter().map(|h| (*h).to_string()).collect()];
    for row in rows {
        let mut cells = vec![
            row.name.clone(),
            row.ready.clone(),
            row.status.clone(),
            row.restarts.to_string(),
            row.age.clone(),
            row.ip.clone(),
            row.node.clone(),
        ];
        if show_namespace {
            cells.insert(0, row.namespace.clone());
        }
        table.push(cells);
    }

    let mut out = String::from("```\n");
    out.push_str(&align(table));
    out.push_str("```\n\n### Pod Status Summary\n");

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.status.as_str()).or_default() += 1;
    }
    for (status, count) in counts {
        let _ = writeln!(out, "- {status}: {count} pod(s)");
    }

    if !problems.is_empty() {
        out.push_str("\n### Problem Pods\n");
        for problem in problems {
            let row = &problem.row;
            let _ = writeln!(
                out,
                "- Namespace: {}, Pod: {}, Status: {}",
                row.namespace, row.name, row.status
            );
            match &problem.details {
                Some(details) => {
                    let _ = write!(out, "\n  Recent conditions:\n```\n{details}\n```\n");
                }
                None => out.push_str("\n  Could not get pod details\n"),
            }
        }
    }

    out
}

/// Lists conditions that are not `True` and container waiting or
/// termination reasons. `None` if there is nothing to report.
pub fn problem_details(pod: &Value) -> Option<String> {
    let mut lines = Vec::new();

    for condition in pod["status"]["conditions"].as_array().into_iter().flatten() {
        if condition["status"].as_str() == Some("True") {
            continue;
        }
        lines.push(format!(
            "{}={} {} {}",
            text(&condition["type"]),
            text(&condition["status"]),
            text(&condition["reason"]),
            condition["message"].as_str().unwrap_or_default(),
        ));
    }

    for status in pod["status"]["containerStatuses"].as_array().into_iter().flatten() {
        for state in ["waiting", "terminated"] {
            let detail = &status["state"][state];
            if detail.is_object() {
                lines.push(format!(
                    "container {} {}: {} {}",
                    text(&status["name"]),
                    state,
                    text(&detail["reason"]),
                    detail["message"].as_str().unwrap_or_default(),
                ));
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.iter().map(|l| l.trim_end()).collect::<Vec<_>>().join("\n"))
    }
}

/// Renders a single pod in a `kubectl describe`-like layout.
pub fn describe_text(pod: &Value) -> String {
    let metadata = &pod["metadata"];
    let status = &pod["status"];
    let mut out = String::from("```\n");

    let _ = writeln!(out, "Name:         {}", text(&metadata["name"]));
    let _ = writeln!(out, "Namespace:    {}", text(&metadata["namespace"]));
    let _ = writeln!(out, "Node:         {}", text(&pod["spec"]["nodeName"]));
    let _ = writeln!(out, "Start Time:   {}", text(&metadata["creationTimestamp"]));
    let _ = writeln!(out, "Status:       {}", pod_status(pod));
    let _ = writeln!(out, "IP:           {}", text(&status["podIP"]));

    if let Some(labels) = metadata["labels"].as_object() {
        let rendered: Vec<String> = labels
            .iter()
            .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
            .collect();
        let _ = writeln!(out, "Labels:       {}", rendered.join(","));
    }

    out.push_str("Containers:\n");
    for container in pod["spec"]["containers"].as_array().into_iter().flatten() {
        let name = text(&container["name"]);
        let _ = writeln!(out, "  {name}:");
        let _ = writeln!(out, "    Image:          {}", text(&container["image"]));
        let state = status["containerStatuses"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|s| s["name"].as_str() == Some(name.as_str()));
        if let Some(state) = state {
            let current = state["state"]
                .as_object()
                .and_then(|s| s.keys().next().cloned())
                .unwrap_or_else(|| "<unknown>".to_string());
            let _ = writeln!(out, "    State:          {current}");
            let _ = writeln!(out, "    Ready:          {}", state["ready"].as_bool().unwrap_or(false));
            let _ = writeln!(out, "    Restart Count:  {}", state["restartCount"].as_u64().unwrap_or(0));
        }
    }

    if let Some(conditions) = status["conditions"].as_array() {
        out.push_str("Conditions:\n  Type           Status\n");
        for condition in conditions {
            let _ = writeln!(
                out,
                "  {:<14} {}",
                text(&condition["type"]),
                text(&condition["status"])
            );
        }
    }

    out.push_str("```");
    out
}

/// Shown instead of an empty code block.
pub const NO_LOGS: &str = "No logs available for the specified pod/container.";

/// Wraps log text in a code block.
pub fn logs_text(logs: &str) -> String {
    if logs.trim().is_empty() {
        return NO_LOGS.to_string();
    }
    format!("```\n{}\n```", logs.trim_end())
}

/// Computes the displayed status the way `kubectl get pods` does: a
/// container waiting or termination reason wins over the pod phase.
fn pod_status(pod: &Value) -> String {
    if pod["metadata"]["deletionTimestamp"].is_string() {
        return "Terminating".to_string();
    }

    let reason = pod["status"]["containerStatuses"]
        .as_array()
        .into_iter()
        .flatten()
        .find_map(|s| {
            s["state"]["waiting"]["reason"]
                .as_str()
                .or_else(|| s["state"]["terminated"]["reason"].as_str())
        });

    reason
        .or_else(|| pod["status"]["reason"].as_str())
        .or_else(|| pod["status"]["phase"].as_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn human_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 120 => format!("{s}s"),
        s if s < 7_200 => format!("{}m", s / 60),
        s if s < 172_800 => format!("{}h", s / 3_600),
        s => format!("{}d", s / 86_400),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "<none>".to_string(),
        other => other.to_string(),
    }
}

/// Left-aligned columns three spaces apart, no borders.
fn align(table: Vec<Vec<String>>) -> String {
    let mut table = Builder::from(table).build();
    table.with(Style::empty()).with(Padding::new(0, 3, 0, 0));

    let mut out = String::new();
    for line in table.to_string().lines() {
        out.push_str(line.trim());
        out.push('\n');
    }
    out
}

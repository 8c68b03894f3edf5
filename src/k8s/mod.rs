//! Kubernetes backend access.
//!
//! This module wraps the cluster API behind a client that never fails
//! toward its callers: when the cluster cannot be reached, answers come from
//! a deterministic synthetic backend instead.
//!
//! # Architecture
//!
//! The module is organized into:
//! - `client`: the lazily initialized [`BackendClient`] plus the
//!   [`ClusterApi`]/[`Connector`] seams and their `kube` implementations
//! - `synthetic`: the [`SyntheticBackend`] used as a stand-in
//!
//! # Usage
//!
//! ```ignore
//! use k8s_mcp::config::ConfigResolver;
//! use k8s_mcp::k8s::{BackendClient, KubeConnector};
//!
//! let client = BackendClient::new(ConfigResolver::builder().build(), KubeConnector::new());
//! let pods = client.list_pods(Some("default"), None).await.into_inner();
//! ```

pub mod client;
pub mod synthetic;

use crate::error::KubeError;

pub use client::{BackendClient, ClusterApi, Connector, KubeConnector};
pub use synthetic::SyntheticBackend;

/// Result type for live backend operations.
pub type KubeResult<T> = std::result::Result<T, KubeError>;

/// A backend payload tagged with where it came from.
///
/// The tag never reaches the wire; it exists so the substitution boundary
/// can be observed in logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sourced<T> {
    /// Returned by the live cluster.
    Live(T),
    /// Substituted by the synthetic backend.
    Synthetic(T),
}

impl<T> Sourced<T> {
    /// Returns `true` if the payload was substituted.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }

    /// Discards the tag.
    pub fn into_inner(self) -> T {
        match self {
            Self::Live(value) | Self::Synthetic(value) => value,
        }
    }

    /// Borrows the payload.
    pub fn get(&self) -> &T {
        match self {
            Self::Live(value) | Self::Synthetic(value) => value,
        }
    }
}

/// Options for fetching container logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Container to read; the pod's only container when `None`.
    pub container: Option<String>,
    /// Number of trailing lines to return.
    pub tail_lines: Option<i64>,
    /// Read the previous terminated container instance.
    pub previous: bool,
}

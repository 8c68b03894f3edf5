//! Error types for the k8s-mcp server.
//!
//! This module defines all error types used throughout the application,
//! organized by subsystem: configuration, Kubernetes backend, request
//! handlers and transports.
//!
//! Only [`TransportError`] leaves the library; the binary wraps it with
//! `anyhow` context. Backend errors never cross the dispatcher boundary:
//! the backend client absorbs them into synthetic substitution. Handler
//! errors are flattened to JSON-RPC `-32000` by the dispatcher.

use thiserror::Error;

/// Errors produced while evaluating a backend configuration candidate.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The candidate file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the candidate file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The candidate file is not valid YAML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the candidate file.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The candidate parsed but does not describe a usable cluster.
    #[error("invalid kubernetes configuration: {0}")]
    Invalid(String),

    /// The candidate's server URL is missing or empty.
    #[error("server URL is missing or empty")]
    MissingServer,

    /// The candidate's server URL cannot be parsed.
    #[error("server URL '{url}' is invalid: {reason}")]
    InvalidServer {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Errors related to the live Kubernetes backend.
#[derive(Debug, Error)]
pub enum KubeError {
    /// The API server URL could not be turned into a client endpoint.
    #[error("invalid API server URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The kube client could not be constructed.
    #[error("failed to build kubernetes client: {0}")]
    ClientBuild(#[source] kube::Error),

    /// An API call against the cluster failed.
    #[error("kubernetes API call '{operation}' failed: {source}")]
    Api {
        /// The backend operation that failed.
        operation: &'static str,
        /// Underlying kube error.
        #[source]
        source: kube::Error,
    },

    /// A cluster response could not be converted to JSON.
    #[error("failed to serialize kubernetes response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while executing a dispatcher handler.
///
/// Every variant surfaces to the caller as JSON-RPC `-32000` with the
/// display text in `error.data`.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A required parameter is absent or empty.
    #[error("{method}: missing required parameter '{param}'")]
    MissingParam {
        /// The method being handled.
        method: &'static str,
        /// The missing parameter.
        param: &'static str,
    },

    /// The params value does not match the method's parameter shape.
    #[error("{method}: invalid params: {source}")]
    InvalidParams {
        /// The method being handled.
        method: &'static str,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Errors related to transport adapters.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error during transport operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No port in the retry window could be bound.
    #[error("failed to bind any port in {first}..={last}: {source}")]
    Bind {
        /// First port tried.
        first: u16,
        /// Last port tried.
        last: u16,
        /// Error from the last attempt.
        #[source]
        source: std::io::Error,
    },

    /// The stdio writer task stopped unexpectedly.
    #[error("stdio writer task failed: {0}")]
    WriterTask(String),
}

//! k8s-mcp
//!
//! A read-only MCP (Model Context Protocol) server that lets LLM
//! applications inspect Kubernetes pods over JSON-RPC 2.0.
//!
//! # Overview
//!
//! This library provides:
//! - A transport-agnostic JSON-RPC method table
//! - A Kubernetes backend client that falls back to synthetic data when the
//!   cluster is unreachable
//! - Stdio, HTTP and WebSocket transport adapters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  stdio / HTTP   ┌─────────────────┐
//! │   LLM Client    │◄───────────────►│   Transport     │
//! │  (MCP client)   │  / WebSocket    │    Adapters     │
//! └─────────────────┘                 └────────┬────────┘
//!                                              │ dispatch()
//!                                       ┌──────▼──────┐
//!                                       │ Dispatcher  │
//!                                       └──────┬──────┘
//!                                              │
//!                                       ┌──────▼──────┐   on failure   ┌───────────┐
//!                                       │   Backend   │───────────────►│ Synthetic │
//!                                       │   Client    │                │  Backend  │
//!                                       └──────┬──────┘                └───────────┘
//!                                              │ kube
//!                                       ┌──────▼────────┐
//!                                       │  Kubernetes   │
//!                                       │  API server   │
//!                                       └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`] - Backend configuration resolution
//! - [`error`] - Error types for the entire application
//! - [`k8s`] - Backend client and synthetic backend
//! - [`mcp`] - JSON-RPC protocol model and dispatcher
//! - [`transport`] - Stdio, HTTP and WebSocket adapters
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use k8s_mcp::config::ConfigResolver;
//! use k8s_mcp::k8s::{BackendClient, KubeConnector};
//! use k8s_mcp::mcp::Dispatcher;
//! use k8s_mcp::transport::StdioTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = BackendClient::new(ConfigResolver::builder().build(), KubeConnector::new());
//!     let dispatcher = Dispatcher::new(Arc::new(backend));
//!
//!     StdioTransport::new(dispatcher).run().await?;
//!
//!     Ok(())
//! }
//! ```

// Enforce documentation and other quality attributes
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are too strict
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod k8s;
pub mod mcp;
pub mod transport;

//! MCP (Model Context Protocol) method table.
//!
//! This module implements the transport-agnostic core of the server: it
//! turns one decoded JSON-RPC message into at most one response.
//!
//! # Architecture
//!
//! The MCP module is organized into:
//! - `protocol`: JSON-RPC 2.0 envelopes and error codes
//! - `tools`: typed tool parameters and the static tool catalog
//! - `dispatcher`: method routing and error packaging
//!
//! # Usage
//!
//! ```ignore
//! use k8s_mcp::mcp::Dispatcher;
//!
//! let dispatcher = Dispatcher::new(backend);
//! let reply = dispatcher
//!     .dispatch(serde_json::json!({"jsonrpc": "2.0", "method": "initialize", "id": 1}))
//!     .await;
//! ```

pub mod dispatcher;
pub mod protocol;
pub mod tools;

pub use dispatcher::{Dispatcher, Method};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId, ToolResult};

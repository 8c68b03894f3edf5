//! JSON-RPC 2.0 envelopes and MCP result wrappers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only accepted protocol tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Malformed request envelope.
pub const INVALID_REQUEST: i64 = -32600;

/// Method name not in the method table.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Any other failure.
pub const INTERNAL_ERROR: i64 = -32000;

/// JSON-RPC 2.0 ID. May be a number or a string; numbers keep their exact
/// textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    /// A numeric id.
    Number(serde_json::Number),
    /// A string id.
    Str(String),
}

impl From<i64> for RpcId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

impl From<&str> for RpcId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

/// A validated JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Method name, never empty.
    pub method: String,
    /// Parameters; an explicit `null` is stored as `None`.
    pub params: Option<Value>,
    /// `None` marks a notification (`"id": null`).
    pub id: Option<RpcId>,
}

impl JsonRpcRequest {
    /// Returns `true` if no response is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Why a message was rejected as an Invalid Request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// The message is not an object.
    #[error("request is not a JSON object")]
    NotAnObject,
    /// `jsonrpc` is missing or not `"2.0"`.
    #[error("jsonrpc must be \"2.0\"")]
    BadVersion,
    /// `method` is missing, empty or not a string.
    #[error("method must be a non-empty string")]
    BadMethod,
    /// `id` is missing or has an unsupported type.
    #[error("id must be present and be a string, a number or null")]
    BadId,
}

impl TryFrom<Value> for JsonRpcRequest {
    type Error = EnvelopeError;

    fn try_from(message: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut object) = message else {
            return Err(EnvelopeError::NotAnObject);
        };

        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(EnvelopeError::BadVersion);
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            _ => return Err(EnvelopeError::BadMethod),
        };

        let id = match object.remove("id") {
            Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(RpcId::Number(n)),
            Some(Value::String(s)) => Some(RpcId::Str(s)),
            None | Some(_) => return Err(EnvelopeError::BadId),
        };

        let params = object.remove("params").filter(|p| !p.is_null());

        Ok(Self { method, params, id })
    }
}

/// JSON-RPC 2.0 response envelope. Exactly one of `result` and `error` is
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The request id; serialized as `null` when absent.
    pub id: Option<RpcId>,
    /// Handler result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    pub fn success(id: Option<RpcId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    pub fn error(id: Option<RpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Short fixed message for the code.
    pub message: String,
    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// `-32600 Invalid Request`.
    pub fn invalid_request() -> Self {
        Self {
            code: INVALID_REQUEST,
            message: "Invalid Request".into(),
            data: None,
        }
    }

    /// `-32601 Method not found`.
    pub fn method_not_found() -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: "Method not found".into(),
            data: None,
        }
    }

    /// `-32000 Internal error` carrying `detail` as `data`.
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: "Internal error".into(),
            data: Some(Value::String(detail.into())),
        }
    }
}

/// MCP-style tool result used by the auxiliary HTTP routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content blocks.
    pub content: Vec<ToolResultContent>,
    /// Set when the result describes a failure.
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// A single content block inside a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultContent {
    /// Always `"text"`.
    #[serde(rename = "type")]
    pub content_type: String,
    /// The text.
    pub text: String,
}

impl ToolResult {
    /// A successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".into(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// A failed text result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }
}

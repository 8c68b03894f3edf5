//! The method table.
//!
//! [`Dispatcher::dispatch`] is the single entry point shared by every
//! transport. It validates the envelope, routes the method, runs the handler
//! and packages the outcome. It never fails toward its caller: every handler
//! error or panic becomes a `-32000` response carrying the request id.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::tools::{DescribePodParams, PodLogsParams, PodStatusParams, tool_descriptors};
use crate::error::HandlerError;
use crate::k8s::{BackendClient, LogOptions};

/// MCP protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "k8s-mcp";

/// A routable method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `tools/list`, alias `get_tools`
    ListTools,
    /// `get_pod_status`
    GetPodStatus,
    /// `describe_pod`
    DescribePod,
    /// `get_pod_logs`
    GetPodLogs,
}

impl Method {
    /// Maps a wire name to a method. `tools/list` and `get_tools` are
    /// aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "tools/list" | "get_tools" => Some(Self::ListTools),
            "get_pod_status" => Some(Self::GetPodStatus),
            "describe_pod" => Some(Self::DescribePod),
            "get_pod_logs" => Some(Self::GetPodLogs),
            _ => None,
        }
    }

    /// Canonical wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::ListTools => "tools/list",
            Self::GetPodStatus => "get_pod_status",
            Self::DescribePod => "describe_pod",
            Self::GetPodLogs => "get_pod_logs",
        }
    }
}

/// Routes JSON-RPC requests to backend operations.
///
/// Cloning is cheap; all clones share the same backend and static
/// descriptors.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    backend: Arc<BackendClient>,
    server_info: Arc<Value>,
    tools: Arc<Value>,
}

impl Dispatcher {
    /// Creates a dispatcher over `backend`. Static descriptors are built
    /// here, once.
    pub fn new(backend: Arc<BackendClient>) -> Self {
        let server_info = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {
                "toolsSupport": true,
                "workspaceSupport": false,
            },
        });

        let tools = serde_json::to_value(tool_descriptors()).unwrap_or_else(|e| {
            error!(error = %e, "failed to serialize tool descriptors");
            Value::Array(Vec::new())
        });

        Self {
            backend,
            server_info: Arc::new(server_info),
            tools: Arc::new(tools),
        }
    }

    /// The shared backend client.
    pub fn backend(&self) -> &Arc<BackendClient> {
        &self.backend
    }

    /// Dispatches one decoded message.
    ///
    /// Returns `None` for notifications. Malformed envelopes always get an
    /// Invalid Request response with a null id.
    pub async fn dispatch(&self, message: Value) -> Option<JsonRpcResponse> {
        match JsonRpcRequest::try_from(message) {
            Ok(request) => self.dispatch_request(request).await,
            Err(reason) => {
                warn!(%reason, "rejecting malformed request");
                Some(JsonRpcResponse::error(None, JsonRpcError::invalid_request()))
            }
        }
    }

    /// Dispatches an already validated request.
    pub async fn dispatch_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        let JsonRpcRequest { method, params, id } = request;

        let response = match Method::from_name(&method) {
            None => {
                debug!(%method, "method not found");
                JsonRpcResponse::error(id.clone(), JsonRpcError::method_not_found())
            }
            Some(method) => {
                let outcome = AssertUnwindSafe(self.handle(method, params.as_ref()))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));

                match outcome {
                    Ok(result) => JsonRpcResponse::success(id.clone(), result),
                    Err(e) => {
                        error!(method = method.name(), error = %e, "handler failed");
                        JsonRpcResponse::error(id.clone(), JsonRpcError::internal_error(e.to_string()))
                    }
                }
            }
        };

        if notification {
            debug!(%method, "notification handled, no response sent");
            return None;
        }
        Some(response)
    }

    async fn handle(&self, method: Method, params: Option<&Value>) -> Result<Value, HandlerError> {
        match method {
            Method::Initialize => Ok(Value::clone(&self.server_info)),
            Method::ListTools => Ok(Value::clone(&self.tools)),
            Method::GetPodStatus => {
                let params: PodStatusParams = parse_params(method, params)?;
                let pods = self
                    .backend
                    .list_pods(params.namespace.as_deref(), params.selector.as_deref())
                    .await;
                Ok(pods.into_inner())
            }
            Method::DescribePod => {
                require_pod_name(method, params)?;
                let params: DescribePodParams = parse_params(method, params)?;
                let pod = self
                    .backend
                    .describe_pod(&params.pod_name, params.namespace.as_deref())
                    .await;
                Ok(pod.into_inner())
            }
            Method::GetPodLogs => {
                require_pod_name(method, params)?;
                let params: PodLogsParams = parse_params(method, params)?;
                let options = LogOptions {
                    container: params.container,
                    tail_lines: params.tail_lines,
                    previous: params.previous.unwrap_or(false),
                };
                let logs = self
                    .backend
                    .pod_logs(&params.pod_name, params.namespace.as_deref(), &options)
                    .await;
                Ok(Value::String(logs.into_inner()))
            }
        }
    }
}

/// Deserializes `params`, treating absent params as an empty object.
fn parse_params<T: DeserializeOwned>(method: Method, params: Option<&Value>) -> Result<T, HandlerError> {
    let value = params.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|source| HandlerError::InvalidParams {
        method: method.name(),
        source,
    })
}

fn require_pod_name(method: Method, params: Option<&Value>) -> Result<(), HandlerError> {
    match params.and_then(|p| p.get("pod_name")).and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(HandlerError::MissingParam {
            method: method.name(),
            param: "pod_name",
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_aliases() {
        assert_eq!(Method::from_name("tools/list"), Some(Method::ListTools));
        assert_eq!(Method::from_name("get_tools"), Some(Method::ListTools));
        assert_eq!(Method::from_name("tools/call"), None);
        assert_eq!(Method::from_name("GET_POD_STATUS"), None);
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in [
            Method::Initialize,
            Method::ListTools,
            Method::GetPodStatus,
            Method::DescribePod,
            Method::GetPodLogs,
        ] {
            assert_eq!(Method::from_name(method.name()), Some(method));
        }
    }

    #[test]
    fn test_require_pod_name() {
        assert!(require_pod_name(Method::DescribePod, Some(&json!({"pod_name": "x"}))).is_ok());
        assert!(require_pod_name(Method::DescribePod, None).is_err());
        assert!(require_pod_name(Method::DescribePod, Some(&json!({"pod_name": "  "}))).is_err());
        assert!(require_pod_name(Method::DescribePod, Some(&json!({"pod_name": 3}))).is_err());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}

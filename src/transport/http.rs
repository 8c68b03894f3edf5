//! HTTP transport.
//!
//! Routes:
//! - `POST /mcp`: one JSON-RPC request per body
//! - `GET /mcp`: WebSocket upgrade, see [`super::ws`]
//! - `POST /api/k8s/pods/{status,describe,logs}`: Markdown tool results
//! - `GET /health`

use std::net::{IpAddr, SocketAddr};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::format::{self, PodRow, ProblemPod};
use super::{encode_response, parse_failure, ws};
use crate::error::TransportError;
use crate::k8s::LogOptions;
use crate::mcp::{Dispatcher, JsonRpcResponse, ToolResult};

/// How many ports above the requested one to try when it is taken.
pub const MAX_PORT_RETRIES: u16 = 10;

/// Builds the application router.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/mcp", post(mcp_request).get(ws::upgrade))
        .route("/api/k8s/pods/status", post(pod_status))
        .route("/api/k8s/pods/describe", post(pod_describe))
        .route("/api/k8s/pods/logs", post(pod_logs))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Binds a listener and serves [`router`] until the process ends.
pub async fn serve(dispatcher: Dispatcher, host: IpAddr, port: u16) -> Result<(), TransportError> {
    let listener = bind_with_retry(host, port, MAX_PORT_RETRIES).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening (MCP at /mcp)");
    axum::serve(listener, router(dispatcher)).await?;
    Ok(())
}

/// Binds `host:port`, moving to the next port while the address is in use.
pub async fn bind_with_retry(host: IpAddr, port: u16, retries: u16) -> Result<TcpListener, TransportError> {
    let last = port.saturating_add(retries);
    let mut candidate = port;

    loop {
        match TcpListener::bind(SocketAddr::new(host, candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse && candidate < last => {
                warn!(port = candidate, next = candidate + 1, "port in use, trying next");
                candidate += 1;
            }
            Err(source) => {
                return Err(TransportError::Bind {
                    first: port,
                    last: candidate,
                    source,
                });
            }
        }
    }
}

async fn mcp_request(State(dispatcher): State<Dispatcher>, body: Bytes) -> Response {
    let message = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "failed to parse request body");
            return json_response(StatusCode::INTERNAL_SERVER_ERROR, &parse_failure(&e));
        }
    };

    match dispatcher.dispatch(message).await {
        Some(response) => json_response(StatusCode::OK, &response),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn json_response(status: StatusCode, response: &JsonRpcResponse) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        encode_response(response),
    )
        .into_response()
}

async fn health() -> Response {
    axum::Json(json!({ "status": "ok" })).into_response()
}

/// Body accepted by the auxiliary pod routes.
#[derive(Debug, Default, Deserialize)]
struct PodQuery {
    namespace: Option<String>,
    pod_name: Option<String>,
    selector: Option<String>,
    #[serde(default)]
    all_namespaces: bool,
    container: Option<String>,
    tail_lines: Option<i64>,
    #[serde(default)]
    previous: bool,
}

impl PodQuery {
    fn parse(body: &Bytes) -> Result<Self, Response> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            tool_response(
                StatusCode::BAD_REQUEST,
                ToolResult::error(format!("Invalid request body: {e}")),
            )
        })
    }

    fn require_pod_name(&self) -> Result<&str, Response> {
        match self.pod_name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(tool_response(
                StatusCode::BAD_REQUEST,
                ToolResult::error("Missing required parameter: pod_name"),
            )),
        }
    }
}

fn tool_response(status: StatusCode, result: ToolResult) -> Response {
    (status, axum::Json(result)).into_response()
}

async fn pod_status(State(dispatcher): State<Dispatcher>, body: Bytes) -> Response {
    let query = match PodQuery::parse(&body) {
        Ok(query) => query,
        Err(rejection) => return rejection,
    };
    let backend = dispatcher.backend();

    let requested = query.namespace.as_deref().filter(|ns| !ns.trim().is_empty());
    let namespace = match (query.all_namespaces, requested) {
        (true, _) => None,
        (false, Some(ns)) => Some(ns.to_string()),
        (false, None) => Some(backend.default_namespace().await.to_string()),
    };

    let list = backend
        .list_pods(namespace.as_deref(), query.selector.as_deref())
        .await
        .into_inner();
    let rows = format::pod_rows(&list, query.pod_name.as_deref(), chrono::Utc::now());

    let mut problems = Vec::new();
    for row in rows.iter().filter(|row| row.is_problem()) {
        problems.push(problem_pod(&dispatcher, row).await);
    }
    debug!(pods = rows.len(), problems = problems.len(), "rendered pod status");

    let report = format::status_report(&rows, namespace.is_none(), &problems);
    tool_response(StatusCode::OK, ToolResult::text(report))
}

async fn problem_pod(dispatcher: &Dispatcher, row: &PodRow) -> ProblemPod {
    let pod = dispatcher
        .backend()
        .describe_pod(&row.name, Some(&row.namespace))
        .await;
    let details = if pod.is_synthetic() {
        None
    } else {
        format::problem_details(pod.get())
    };

    ProblemPod {
        row: row.clone(),
        details,
    }
}

async fn pod_describe(State(dispatcher): State<Dispatcher>, body: Bytes) -> Response {
    let query = match PodQuery::parse(&body) {
        Ok(query) => query,
        Err(rejection) => return rejection,
    };
    let name = match query.require_pod_name() {
        Ok(name) => name,
        Err(rejection) => return rejection,
    };

    let pod = dispatcher
        .backend()
        .describe_pod(name, query.namespace.as_deref())
        .await
        .into_inner();
    tool_response(StatusCode::OK, ToolResult::text(format::describe_text(&pod)))
}

async fn pod_logs(State(dispatcher): State<Dispatcher>, body: Bytes) -> Response {
    let query = match PodQuery::parse(&body) {
        Ok(query) => query,
        Err(rejection) => return rejection,
    };
    let name = match query.require_pod_name() {
        Ok(name) => name,
        Err(rejection) => return rejection,
    };

    let options = LogOptions {
        container: query.container.clone(),
        tail_lines: query.tail_lines,
        previous: query.previous,
    };
    let logs = dispatcher
        .backend()
        .pod_logs(name, query.namespace.as_deref(), &options)
        .await
        .into_inner();
    tool_response(StatusCode::OK, ToolResult::text(format::logs_text(&logs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_bind_skips_port_in_use() {
        let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), port, 3)
            .await
            .unwrap();
        let bound = listener.local_addr().unwrap().port();
        assert_ne!(bound, port);
        assert!(bound > port && bound <= port + 3);
    }

    #[test]
    fn test_pod_query_empty_body() {
        let query = PodQuery::parse(&Bytes::new()).unwrap();
        assert!(query.pod_name.is_none());
        assert!(!query.all_namespaces);
    }

    #[test]
    fn test_pod_query_requires_name() {
        let query = PodQuery::parse(&Bytes::from_static(br#"{"pod_name": " "}"#)).unwrap();
        let rejection = query.require_pod_name().unwrap_err();
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }
}

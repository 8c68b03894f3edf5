//! Transport adapters.
//!
//! Every adapter does the same three things: decode a message, call
//! [`Dispatcher::dispatch`], and encode the response with
//! [`encode_response`]. Sharing the encoder keeps response bytes identical
//! across transports.
//!
//! - `stdio`: newline-delimited JSON-RPC on stdin/stdout
//! - `http`: `POST /mcp`, auxiliary pod routes and `/health`
//! - `ws`: `GET /mcp` WebSocket upgrade, one request per text frame
//! - `format`: human-readable text for the auxiliary routes

pub mod format;
pub mod http;
pub mod stdio;
pub mod ws;

use serde_json::Value;
use tracing::{error, warn};

use crate::mcp::{Dispatcher, JsonRpcError, JsonRpcResponse};

pub use stdio::StdioTransport;

/// Sent when a response cannot be serialized.
const ENCODE_FAILURE: &str = r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32000,"message":"Internal error","data":"failed to serialize response"}}"#;

/// Decodes one raw message and dispatches it.
///
/// Text that is not JSON yields a `-32000` response with a null id.
pub async fn handle_text(dispatcher: &Dispatcher, text: &str) -> Option<JsonRpcResponse> {
    match serde_json::from_str::<Value>(text) {
        Ok(message) => dispatcher.dispatch(message).await,
        Err(e) => {
            warn!(error = %e, "failed to parse message");
            Some(parse_failure(&e))
        }
    }
}

/// Response for a message that could not be decoded, with a null id.
pub fn parse_failure(detail: impl std::fmt::Display) -> JsonRpcResponse {
    JsonRpcResponse::error(None, JsonRpcError::internal_error(detail.to_string()))
}

/// Serializes a response. Never fails.
pub fn encode_response(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!(error = %e, "failed to serialize response");
        ENCODE_FAILURE.to_string()
    })
}

//! WebSocket transport on `GET /mcp`.
//!
//! One request per inbound text frame, one text frame per response. Frames
//! on a connection are handled in order; connections are independent.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::{encode_response, handle_text, parse_failure};
use crate::mcp::Dispatcher;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Upgrades the request and serves the socket.
pub async fn upgrade(ws: WebSocketUpgrade, State(dispatcher): State<Dispatcher>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, dispatcher))
}

async fn handle_socket(socket: WebSocket, dispatcher: Dispatcher) {
    let connection = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    info!(connection, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();

    while let Some(message) = receiver.next().await {
        let reply = match message {
            Ok(Message::Text(text)) => process_frame(&dispatcher, text.as_str()).await,
            Ok(Message::Binary(bytes)) => process_binary_frame(&dispatcher, &bytes).await,
            Ok(Message::Ping(data)) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                None
            }
            Ok(Message::Pong(_)) => None,
            Ok(Message::Close(_)) => {
                debug!(connection, "client initiated close");
                break;
            }
            Err(e) => {
                warn!(connection, error = %e, "WebSocket error");
                break;
            }
        };

        if let Some(reply) = reply {
            if sender.send(Message::Text(reply.into())).await.is_err() {
                info!(connection, "failed to send response, client disconnected");
                break;
            }
        }
    }

    info!(connection, "WebSocket client disconnected");
}

/// Handles a binary frame as UTF-8 text. Invalid UTF-8 gets a `-32000`
/// reply with a null id, as on stdio.
pub async fn process_binary_frame(dispatcher: &Dispatcher, bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => process_frame(dispatcher, text).await,
        Err(e) => {
            warn!(error = %e, "binary frame is not valid UTF-8");
            Some(encode_response(&parse_failure(e)))
        }
    }
}

/// Handles one frame's text. Returns the reply frame, or `None` for
/// notifications.
pub async fn process_frame(dispatcher: &Dispatcher, text: &str) -> Option<String> {
    handle_text(dispatcher, text)
        .await
        .map(|response| encode_response(&response))
}

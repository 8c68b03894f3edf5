//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Each line is dispatched on its own task so a slow backend call does not
//! hold up the lines behind it. A single writer task owns the output stream,
//! so responses never interleave mid-line. Responses may be written in a
//! different order than their requests arrived; clients match them by id.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{encode_response, handle_text, parse_failure};
use crate::error::TransportError;
use crate::mcp::Dispatcher;

/// Lines longer than this are rejected without parsing or buffering.
const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Stdio transport adapter.
#[derive(Debug, Clone)]
pub struct StdioTransport {
    dispatcher: Dispatcher,
}

impl StdioTransport {
    /// Creates a transport over `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serves the process's stdin and stdout until stdin closes.
    pub async fn run(self) -> Result<(), TransportError> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serves `reader` and `writer` until `reader` reaches end of input and
    /// every in-flight request has been answered.
    pub async fn serve<R, W>(self, mut reader: R, writer: W) -> Result<(), TransportError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_lines(writer, rx));
        let mut in_flight = JoinSet::new();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let n = (&mut reader)
                .take(MAX_MESSAGE_BYTES as u64 + 1)
                .read_until(b'\n', &mut raw)
                .await?;
            if n == 0 {
                break;
            }

            if n > MAX_MESSAGE_BYTES && raw.last() != Some(&b'\n') {
                let total = n + skip_line(&mut reader).await?;
                warn!(bytes = total, limit = MAX_MESSAGE_BYTES, "message too large");
                let _ = tx.send(encode_response(&parse_failure(format!(
                    "message too large: {total} bytes (limit {MAX_MESSAGE_BYTES})"
                ))));
                continue;
            }

            let line = match std::str::from_utf8(&raw) {
                Ok(s) => s.trim(),
                Err(e) => {
                    warn!(error = %e, "message is not valid UTF-8");
                    let _ = tx.send(encode_response(&parse_failure(e)));
                    continue;
                }
            };

            if line.is_empty() {
                continue;
            }

            let line = line.to_string();
            let dispatcher = self.dispatcher.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = handle_text(&dispatcher, &line).await {
                    let _ = tx.send(encode_response(&response));
                }
            });

            while let Some(finished) = in_flight.try_join_next() {
                log_join(finished);
            }
        }

        info!(pending = in_flight.len(), "input closed, draining in-flight requests");
        while let Some(finished) = in_flight.join_next().await {
            log_join(finished);
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| TransportError::WriterTask(e.to_string()))?
    }
}

/// Consumes input up to and including the next newline without keeping it.
/// Returns the number of bytes skipped.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<usize> {
    let mut skipped = 0;
    loop {
        let (consumed, done) = {
            let buf = reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(skipped);
            }
            match buf.iter().position(|b| *b == b'\n') {
                Some(i) => (i + 1, true),
                None => (buf.len(), false),
            }
        };
        reader.consume(consumed);
        skipped += consumed;
        if done {
            return Ok(skipped);
        }
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "request task failed");
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        debug!(bytes = line.len(), "response written");
    }
    writer.shutdown().await?;
    Ok(())
}

//! k8s-mcp - Entry Point
//!
//! Parses arguments, sets up logging, wires the backend client and
//! dispatcher together, and starts the selected transport.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use k8s_mcp::config::ConfigResolver;
use k8s_mcp::k8s::{BackendClient, KubeConnector};
use k8s_mcp::mcp::Dispatcher;
use k8s_mcp::transport::{self, StdioTransport};

/// Which transport the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportMode {
    /// Newline-delimited JSON-RPC on stdin/stdout.
    Stdio,
    /// HTTP `POST /mcp` plus WebSocket `GET /mcp`.
    Http,
}

/// Read-only Kubernetes inspection over MCP.
#[derive(Parser, Debug)]
#[command(name = "k8s-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transport to serve.
    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value = "http")]
    transport: TransportMode,

    /// Run as a Smithery-hosted server: stdio transport, default backend
    /// configuration.
    #[arg(long, env = "SMITHERY")]
    smithery: bool,

    /// Address the HTTP transport binds to.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port the HTTP transport binds to; the next free port is used if taken.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Namespace used when a request names none.
    #[arg(short, long, env = "K8S_MCP_NAMESPACE")]
    namespace: Option<String>,

    /// Kubernetes API server URL; takes priority over config files.
    #[arg(long, env = "K8S_MCP_API_SERVER")]
    api_server: Option<String>,

    /// Kubeconfig file (first entry of a `:`-separated list is used).
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<String>,

    /// Read timeout for Kubernetes API calls, in seconds.
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "K8S_MCP_LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// Parses the log level string into a tracing Level.
    fn parse_log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => anyhow::bail!("invalid log level: {}", other),
        }
    }

    /// Smithery always runs over stdio.
    fn transport_mode(&self) -> TransportMode {
        if self.smithery {
            TransportMode::Stdio
        } else {
            self.transport
        }
    }

    fn kubeconfig_path(&self) -> Option<PathBuf> {
        self.kubeconfig
            .as_deref()
            .and_then(|paths| paths.split(':').find(|p| !p.is_empty()))
            .map(PathBuf::from)
    }

    fn resolver(&self) -> ConfigResolver {
        ConfigResolver::builder()
            .api_server(self.api_server.clone())
            .kubeconfig(self.kubeconfig_path())
            .namespace_override(self.namespace.clone())
            .defaults_only(self.smithery)
            .build()
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(level: Level, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "k8s_mcp={},tower_http={},kube=warn",
            level, level
        ))
    });

    // stdout carries the stdio protocol stream, so logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    let initialized = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    };
    initialized.context("failed to initialize tracing subscriber")?;

    Ok(())
}

/// Main entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.parse_log_level()?;
    init_tracing(log_level, args.log_json)?;

    let mode = args.transport_mode();
    info!(
        transport = ?mode,
        smithery = args.smithery,
        version = env!("CARGO_PKG_VERSION"),
        "starting k8s-mcp server"
    );

    // Nothing connects until the first request reaches the backend
    let connector =
        KubeConnector::new().with_read_timeout(args.request_timeout_secs.map(Duration::from_secs));
    let backend = Arc::new(BackendClient::new(args.resolver(), connector));
    let dispatcher = Dispatcher::new(backend);

    match mode {
        TransportMode::Stdio => {
            info!("serving MCP over stdio");
            StdioTransport::new(dispatcher)
                .run()
                .await
                .context("stdio transport failed")?;
            info!("stdin closed, shutting down");
        }
        TransportMode::Http => {
            transport::http::serve(dispatcher, args.host, args.port)
                .await
                .context("HTTP transport failed")?;
        }
    }

    Ok(())
}

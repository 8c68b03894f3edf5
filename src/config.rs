//! Backend configuration resolution.
//!
//! Produces the single [`BackendConfig`] used to reach the cluster API by
//! trying an ordered list of candidate sources. The first candidate that
//! yields a usable server URL wins; every failure is logged and skipped.
//! When nothing works, hard-coded defaults are returned. Resolution never
//! fails.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// API server used when no candidate source is usable.
pub const DEFAULT_API_SERVER: &str = "http://localhost:8080";

/// Namespace used when no candidate source names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Kubeconfig file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "k8s_config.yaml";

/// Namespace file mounted into pods with a service account.
const SERVICE_ACCOUNT_NAMESPACE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Connection settings for the cluster API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// URL of the Kubernetes API server.
    pub api_server: String,
    /// Namespace the client defaults to.
    pub namespace: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_server: DEFAULT_API_SERVER.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// A single place a [`BackendConfig`] may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// An API server URL given directly on the command line or environment.
    Explicit {
        /// The API server URL.
        api_server: String,
    },
    /// A kubeconfig-format YAML file.
    Kubeconfig(PathBuf),
    /// The in-cluster service environment injected by Kubernetes.
    ServiceEnv {
        /// Value of `KUBERNETES_SERVICE_HOST`.
        host: Option<String>,
        /// Value of `KUBERNETES_SERVICE_PORT`.
        port: Option<String>,
        /// File holding the pod's namespace.
        namespace_file: PathBuf,
    },
}

impl ConfigSource {
    /// Captures the in-cluster service environment of the current process.
    pub fn in_cluster() -> Self {
        Self::ServiceEnv {
            host: std::env::var("KUBERNETES_SERVICE_HOST").ok(),
            port: std::env::var("KUBERNETES_SERVICE_PORT").ok(),
            namespace_file: PathBuf::from(SERVICE_ACCOUNT_NAMESPACE),
        }
    }

    /// Short human-readable label used in logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Explicit { .. } => "explicit API server".to_string(),
            Self::Kubeconfig(path) => format!("kubeconfig {}", path.display()),
            Self::ServiceEnv { .. } => "in-cluster service environment".to_string(),
        }
    }

    /// Loads and validates this candidate.
    ///
    /// ## Errors
    /// Returns a [`ConfigError`] if the source is missing, unreadable,
    /// unparseable, or has no usable server URL.
    pub fn load(&self) -> Result<BackendConfig, ConfigError> {
        match self {
            Self::Explicit { api_server } => Ok(BackendConfig {
                api_server: validate_server(api_server)?,
                namespace: DEFAULT_NAMESPACE.to_string(),
            }),
            Self::Kubeconfig(path) => load_kubeconfig(path),
            Self::ServiceEnv {
                host,
                port,
                namespace_file,
            } => {
                let host = host
                    .as_deref()
                    .filter(|h| !h.is_empty())
                    .ok_or(ConfigError::MissingEnv("KUBERNETES_SERVICE_HOST"))?;
                let port = port.as_deref().filter(|p| !p.is_empty()).unwrap_or("443");
                let host = if host.contains(':') {
                    format!("[{host}]")
                } else {
                    host.to_string()
                };
                let namespace = std::fs::read_to_string(namespace_file)
                    .map(|ns| ns.trim().to_string())
                    .ok()
                    .filter(|ns| !ns.is_empty())
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

                Ok(BackendConfig {
                    api_server: validate_server(&format!("https://{host}:{port}"))?,
                    namespace,
                })
            }
        }
    }
}

/// Resolves the backend configuration from an ordered candidate list.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    sources: Vec<ConfigSource>,
    namespace_override: Option<String>,
}

impl ConfigResolver {
    /// Creates a resolver over an explicit candidate list.
    pub fn new(sources: Vec<ConfigSource>) -> Self {
        Self {
            sources,
            namespace_override: None,
        }
    }

    /// Creates a resolver that always yields the defaults.
    pub fn defaults_only() -> Self {
        Self::default()
    }

    /// Creates a builder for the standard candidate order.
    pub fn builder() -> ConfigResolverBuilder {
        ConfigResolverBuilder::default()
    }

    /// Replaces whatever namespace resolution produces.
    #[must_use]
    pub fn with_namespace_override(mut self, namespace: Option<String>) -> Self {
        self.namespace_override = namespace.filter(|ns| !ns.trim().is_empty());
        self
    }

    /// Returns the candidate sources in priority order.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Resolves the backend configuration.
    ///
    /// Tries each source in order, accepting the first that loads. Falls
    /// back to [`BackendConfig::default`] if none does.
    pub fn resolve(&self) -> BackendConfig {
        let mut config = self
            .sources
            .iter()
            .find_map(|source| match source.load() {
                Ok(config) => {
                    info!(
                        source = %source.describe(),
                        api_server = %config.api_server,
                        namespace = %config.namespace,
                        "loaded kubernetes configuration"
                    );
                    Some(config)
                }
                Err(e) => {
                    warn!(source = %source.describe(), error = %e, "skipping configuration source");
                    None
                }
            })
            .unwrap_or_else(|| {
                warn!(
                    api_server = DEFAULT_API_SERVER,
                    "no usable kubernetes configuration found, using defaults"
                );
                BackendConfig::default()
            });

        if let Some(namespace) = &self.namespace_override {
            debug!(namespace = %namespace, "applying namespace override");
            config.namespace.clone_from(namespace);
        }

        config
    }
}

/// Builder for the standard candidate order.
///
/// Order: explicit API server, `./k8s_config.yaml`, `$KUBECONFIG` or
/// `~/.kube/config`, then the in-cluster service environment.
#[derive(Debug, Default)]
pub struct ConfigResolverBuilder {
    api_server: Option<String>,
    kubeconfig: Option<PathBuf>,
    local_config: Option<PathBuf>,
    namespace_override: Option<String>,
    defaults_only: bool,
}

impl ConfigResolverBuilder {
    /// Sets an explicit API server URL, tried first.
    #[must_use]
    pub fn api_server(mut self, api_server: Option<String>) -> Self {
        self.api_server = api_server;
        self
    }

    /// Sets the kubeconfig path used instead of `~/.kube/config`.
    #[must_use]
    pub fn kubeconfig(mut self, path: Option<PathBuf>) -> Self {
        self.kubeconfig = path;
        self
    }

    /// Sets the local config file path (defaults to `./k8s_config.yaml`).
    #[must_use]
    pub fn local_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_config = Some(path.into());
        self
    }

    /// Sets the namespace override.
    #[must_use]
    pub fn namespace_override(mut self, namespace: Option<String>) -> Self {
        self.namespace_override = namespace;
        self
    }

    /// Skips every candidate and resolves straight to the defaults.
    #[must_use]
    pub fn defaults_only(mut self, defaults_only: bool) -> Self {
        self.defaults_only = defaults_only;
        self
    }

    /// Builds the resolver.
    pub fn build(self) -> ConfigResolver {
        if self.defaults_only {
            return ConfigResolver::defaults_only().with_namespace_override(self.namespace_override);
        }

        let mut sources = Vec::new();
        if let Some(api_server) = self.api_server.filter(|s| !s.trim().is_empty()) {
            sources.push(ConfigSource::Explicit { api_server });
        }
        sources.push(ConfigSource::Kubeconfig(
            self.local_config
                .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE)),
        ));
        if let Some(path) = self
            .kubeconfig
            .or_else(|| dirs::home_dir().map(|home| home.join(".kube").join("config")))
        {
            sources.push(ConfigSource::Kubeconfig(path));
        }
        sources.push(ConfigSource::in_cluster());

        ConfigResolver::new(sources).with_namespace_override(self.namespace_override)
    }
}

fn load_kubeconfig(path: &Path) -> Result<BackendConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_kubeconfig(&content).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Extracts a [`BackendConfig`] from kubeconfig YAML text.
///
/// Uses the context named by `current-context` when present, otherwise the
/// first context. That context's cluster (or the first cluster) supplies the
/// server URL; the context supplies the namespace.
///
/// ## Errors
/// Returns a [`ConfigError`] when the text is not YAML, has no clusters,
/// or the chosen cluster has no valid server URL.
pub fn parse_kubeconfig(content: &str) -> Result<BackendConfig, ConfigError> {
    let doc: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        path: String::new(),
        source,
    })?;

    let root = doc
        .as_object()
        .ok_or_else(|| ConfigError::Invalid("not a valid YAML object".to_string()))?;

    let clusters = root
        .get("clusters")
        .and_then(Value::as_array)
        .filter(|clusters| !clusters.is_empty())
        .ok_or_else(|| ConfigError::Invalid("clusters array is empty or missing".to_string()))?;

    let context = root.get("contexts").and_then(Value::as_array).and_then(|contexts| {
        root.get("current-context")
            .and_then(Value::as_str)
            .and_then(|current| find_named(contexts, current))
            .or_else(|| contexts.first())
            .and_then(|entry| entry.get("context"))
    });

    let cluster = context
        .and_then(|ctx| ctx.get("cluster"))
        .and_then(Value::as_str)
        .and_then(|name| find_named(clusters, name))
        .or_else(|| clusters.first())
        .and_then(|entry| entry.get("cluster"))
        .filter(|cluster| cluster.is_object())
        .ok_or_else(|| ConfigError::Invalid("selected cluster is invalid".to_string()))?;

    let server = cluster
        .get("server")
        .and_then(Value::as_str)
        .ok_or(ConfigError::MissingServer)?;

    let namespace = context
        .and_then(|ctx| ctx.get("namespace"))
        .and_then(Value::as_str)
        .filter(|ns| !ns.is_empty())
        .unwrap_or(DEFAULT_NAMESPACE);

    Ok(BackendConfig {
        api_server: validate_server(server)?,
        namespace: namespace.to_string(),
    })
}

fn find_named<'a>(entries: &'a [Value], name: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
}

/// Checks that `server` is a non-empty absolute URL and returns it trimmed.
fn validate_server(server: &str) -> Result<String, ConfigError> {
    let server = server.trim();
    if server.is_empty() {
        return Err(ConfigError::MissingServer);
    }

    let uri = server
        .parse::<http::Uri>()
        .map_err(|e| ConfigError::InvalidServer {
            url: server.to_string(),
            reason: e.to_string(),
        })?;

    if uri.scheme().is_none() || uri.host().is_none() {
        return Err(ConfigError::InvalidServer {
            url: server.to_string(),
            reason: "expected an absolute URL with scheme and host".to_string(),
        });
    }

    Ok(server.to_string())
}

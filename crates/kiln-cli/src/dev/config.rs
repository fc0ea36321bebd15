//! Development server options.
//!
//! Derived from [`KilnConfig`]; the opaque `devServer` section is applied
//! last and wins over the computed values.

use crate::build::bundler::WORK_DIR;
use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Paths the dev server proxies to the backend by default.
pub const DEFAULT_PROXY_CONTEXT: [&str; 2] = ["/api", "/backend"];

/// Forward matching request paths to another server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyRule {
    /// Path prefixes that are forwarded
    pub context: Vec<String>,
    /// Base URL requests are forwarded to
    pub target: String,
}

impl ProxyRule {
    pub fn matches(&self, path: &str) -> bool {
        self.context.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
        })
    }
}

/// Recognised keys of the `devServer` config section.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevServerOverrides {
    host: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    history_api_fallback: Option<bool>,
    proxy: Option<ProxyRule>,
    #[serde(default)]
    watch_ignore: Vec<String>,
    debounce_ms: Option<u64>,
}

/// Everything the dev server needs to bind, serve and watch.
#[derive(Debug, Clone)]
pub struct DevOptions {
    /// Requested bind address; see [`find_available_port`]
    pub addr: SocketAddr,

    /// Directory static files are served from (the output path)
    pub content_base: PathBuf,

    /// Document served for unknown paths, e.g. `/frontend/index.html`
    pub history_fallback: Option<String>,

    pub proxy: Option<ProxyRule>,

    /// Extra response headers
    pub headers: BTreeMap<String, String>,

    /// Directory watched for changes
    pub watch_root: PathBuf,

    /// Patterns to ignore when watching files
    pub watch_ignore: Vec<String>,

    /// Debounce delay in milliseconds for file changes
    pub debounce_ms: u64,

    /// Generated reload client, prepended to every client entry
    pub reload_client: PathBuf,
}

impl DevOptions {
    /// Build options from configuration without touching the network.
    pub fn from_config(config: &KilnConfig) -> Result<Self> {
        let overrides: DevServerOverrides = if config.dev_server.is_null() {
            DevServerOverrides::default()
        } else {
            serde_json::from_value(config.dev_server.clone()).map_err(|e| {
                ConfigError::InvalidValue {
                    field: "devServer".to_string(),
                    value: e.to_string(),
                    hint: "Supported keys: host, port, headers, historyApiFallback, proxy, watchIgnore, debounceMs".to_string(),
                }
            })?
        };

        let host = overrides.host.as_deref().unwrap_or(&config.host);
        let ip: IpAddr = resolve_host(host)?;
        let port = overrides.port.unwrap_or(config.port);

        let history_fallback = overrides
            .history_api_fallback
            .unwrap_or(true)
            .then(|| format!("/{}index.html", config.normalized_base_url()));

        let proxy = overrides.proxy.or_else(|| {
            config.backend_url.as_ref().map(|target| ProxyRule {
                context: DEFAULT_PROXY_CONTEXT.iter().map(|s| s.to_string()).collect(),
                target: target.clone(),
            })
        });

        let output_dir = config.output_dir();
        let watch_root = config.source_dir();
        let mut watch_ignore = vec![
            "node_modules".to_string(),
            "*.log".to_string(),
            "*.tmp".to_string(),
        ];
        // Rebuilds write into the output directory; it must not trigger itself
        if let Ok(relative) = output_dir.strip_prefix(&watch_root) {
            watch_ignore.push(relative.to_string_lossy().into_owned());
        }
        watch_ignore.extend(overrides.watch_ignore);

        let mut headers = BTreeMap::from([(
            "Access-Control-Allow-Origin".to_string(),
            "*".to_string(),
        )]);
        headers.extend(overrides.headers);

        Ok(Self {
            addr: SocketAddr::new(ip, port),
            content_base: output_dir,
            history_fallback,
            proxy,
            headers,
            watch_root,
            watch_ignore,
            debounce_ms: overrides.debounce_ms.unwrap_or(100),
            reload_client: config.cwd.join(WORK_DIR).join("reload-client.js"),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn resolve_host(host: &str) -> Result<IpAddr> {
    if host == "localhost" {
        return Ok(IpAddr::from([127, 0, 0, 1]));
    }
    host.parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: "host".to_string(),
            value: host.to_string(),
            hint: "Use an IP address such as 127.0.0.1 or 0.0.0.0, or localhost".to_string(),
        }
        .into()
    })
}

/// Find an available port starting from the requested one.
///
/// Tries the requested port first, then the next 10.
pub fn find_available_port(requested: SocketAddr) -> Result<SocketAddr> {
    use std::net::TcpListener;

    if requested.port() < 1024 && requested.port() != 0 {
        crate::ui::warning(&format!(
            "Port {} is in privileged range, may require root access",
            requested.port()
        ));
    }

    if TcpListener::bind(requested).is_ok() {
        return Ok(requested);
    }

    for offset in 1..=10 {
        let port = requested.port().saturating_add(offset);
        let addr = SocketAddr::new(requested.ip(), port);
        if TcpListener::bind(addr).is_ok() {
            crate::ui::warning(&format!(
                "Port {} is busy, using port {} instead",
                requested.port(),
                port
            ));
            return Ok(addr);
        }
    }

    Err(ConfigError::InvalidValue {
        field: "port".to_string(),
        value: requested.port().to_string(),
        hint: format!(
            "Ports {}-{} are all in use. Try a different port range.",
            requested.port(),
            requested.port().saturating_add(10)
        ),
    }
    .into())
}

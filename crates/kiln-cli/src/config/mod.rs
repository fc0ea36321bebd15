//! Configuration for Kiln with multi-source loading.
//!
//! A single immutable [`KilnConfig`] is assembled once at startup and passed
//! by reference (or `Arc`) to every component. Nothing reads or mutates
//! ambient configuration afterwards.
//!
//! Priority: CLI > Environment (`KILN_*`) > kiln.config.json > Defaults

mod defaults;
mod loading;
mod types;
mod validation;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use defaults::*;
pub use loading::ConfigOverrides;
pub use types::*;

/// Kiln configuration - loaded from kiln.config.json, env and CLI args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KilnConfig {
    /// Project root; relative paths below resolve against it
    pub cwd: PathBuf,

    /// Dev server / gateway bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Dev server / gateway bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Build output directory (also the static content root)
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Prefix for emitted asset file names
    #[serde(default)]
    pub static_path: String,

    /// Application source directory
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,

    /// Public base URL segment (normalized with [`KilnConfig::normalized_base_url`])
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Content-hash emitted file names; defaults to on in production
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_hash: Option<bool>,

    /// Enable the bundler's persistent cache
    #[serde(default)]
    pub use_cache: bool,

    /// Inline SVG files instead of emitting them
    #[serde(default)]
    pub inline_svg: bool,

    /// Render entry point (server bundle entry)
    #[serde(default = "default_server_path")]
    pub server_path: PathBuf,

    /// Application component used by the render entry
    #[serde(default = "default_application_path")]
    pub application_path: PathBuf,

    /// Route table used by the render entry
    #[serde(default = "default_routes_path")]
    pub routes_path: PathBuf,

    /// Component registry used by the render entry
    #[serde(default = "default_components_path")]
    pub components_path: PathBuf,

    /// Languages exposed to the render entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,

    /// Declarative entry registrations, in order
    #[serde(default)]
    pub entries: Vec<EntryPattern>,

    /// External bundler invocation
    #[serde(default)]
    pub bundler: BundlerConfig,

    /// Backend proxied by the dev server for `/api` and `/backend`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Server-side rendering settings
    #[serde(default)]
    pub ssr: SsrSettings,

    /// Custom client build description, merged over the generated one
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub webpack: serde_json::Value,

    /// Custom dev server options
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub dev_server: serde_json::Value,
}

impl KilnConfig {
    /// Resolve a configured path against `cwd`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output_path)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.resolve(&self.source_path)
    }

    /// Location of the build manifest.
    pub fn stats_path(&self) -> PathBuf {
        self.output_dir().join(STATS_FILE_NAME)
    }

    /// Compiled server bundle executed by the production gateway.
    pub fn server_bundle_path(&self) -> PathBuf {
        self.output_dir().join("server.js")
    }

    /// Base URL without surrounding slashes plus one trailing slash,
    /// or the empty string when no base URL is configured.
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        }
    }

    /// Whether emitted names carry a content hash in `mode`.
    pub fn use_hash_for(&self, mode: BuildMode) -> bool {
        self.use_hash.unwrap_or(mode.is_production())
    }

    pub fn public_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

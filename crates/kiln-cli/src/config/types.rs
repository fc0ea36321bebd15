use serde::{Deserialize, Serialize};

/// How an entry pattern turns matched files into bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Primary application entry, always grouped under `index`
    Base,
    /// Explicitly named entry (name required)
    #[default]
    Entry,
    /// Stylesheets: `style-<name>` when named, file-name convention otherwise
    Styles,
}

/// One declarative entry registration, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPattern {
    /// Registration kind
    #[serde(default)]
    pub kind: EntryKind,

    /// Glob pattern, relative to `cwd` unless absolute
    pub pattern: String,

    /// Bundle name (required for `entry`, optional for `styles`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntryPattern {
    pub fn base(pattern: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Base,
            pattern: pattern.into(),
            name: None,
        }
    }

    pub fn entry(pattern: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Entry,
            pattern: pattern.into(),
            name: Some(name.into()),
        }
    }

    pub fn styles(pattern: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            kind: EntryKind::Styles,
            pattern: pattern.into(),
            name: name.map(str::to_string),
        }
    }
}

/// External bundler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerConfig {
    /// Program to execute (e.g. `npx`)
    #[serde(default = "crate::config::defaults::default_bundler_command")]
    pub command: String,

    /// Arguments placed before `--config <description> --json`
    #[serde(default = "crate::config::defaults::default_bundler_args")]
    pub args: Vec<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: crate::config::defaults::default_bundler_command(),
            args: crate::config::defaults::default_bundler_args(),
        }
    }
}

/// Server-side rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrSettings {
    /// Interpreter used to run the render script
    #[serde(default = "crate::config::defaults::default_node_binary")]
    pub node_binary: String,

    /// Extra interpreter arguments (e.g. a TypeScript loader in development)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_args: Vec<String>,

    /// Abort a render after this many milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_timeout_ms: Option<u64>,

    /// URL rendered by `kiln serve --verify`
    #[serde(default = "crate::config::defaults::default_verify_url")]
    pub verify_url: String,

    /// Custom server build description, merged over the generated one
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub overrides: serde_json::Value,
}

impl Default for SsrSettings {
    fn default() -> Self {
        Self {
            node_binary: crate::config::defaults::default_node_binary(),
            node_args: Vec::new(),
            render_timeout_ms: None,
            verify_url: crate::config::defaults::default_verify_url(),
            overrides: serde_json::Value::Null,
        }
    }
}

/// Build mode, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }
}

/// Process-level switches the orchestrator branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMode {
    pub build: BuildMode,
    pub ssr: bool,
    /// One-shot render verification instead of serving
    pub verify_ssr: bool,
}

impl RunMode {
    pub fn development(ssr: bool) -> Self {
        Self {
            build: BuildMode::Development,
            ssr,
            verify_ssr: false,
        }
    }

    pub fn production(ssr: bool) -> Self {
        Self {
            build: BuildMode::Production,
            ssr,
            verify_ssr: false,
        }
    }
}

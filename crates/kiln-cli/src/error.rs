//! Error handling for the Kiln CLI.
//!
//! The hierarchy mirrors the failure classes of the build pipeline:
//! - **Top-level errors** (`CliError`) are what commands return
//! - **Domain errors** (`ConfigError`, `BuildError`, `ManifestError`,
//!   `RenderError`) carry the detail and an actionable hint
//! - Conversion into `CliError` is automatic via `#[from]`
//!
//! Build diagnostics (compile errors reported by the bundler) are *not* errors
//! in this sense: they travel inside a [`BuildOutcome`](crate::build::BuildOutcome)
//! and only decide the process exit status.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn load(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Run `kiln build` first")
//! }
//! ```

mod report;

use std::path::PathBuf;
use thiserror::Error;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (no entries, invalid values, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The build tooling failed to run
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Manifest (stats.json) persistence errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Render contract rejected a request
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server errors (bind failures, serve loop errors)
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration errors.
///
/// `NoEntries` is the fatal startup condition: with nothing to build the
/// pipeline cannot start.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Entry resolution produced an empty entry map
    #[error("No entries resolved from {patterns} pattern(s) and no default entry found in {}\n\nHint: Add an `entries` list to kiln.config.json or create {}/index.tsx", .source_path.display(), .source_path.display())]
    NoEntries {
        /// Number of patterns that were registered
        patterns: usize,
        /// Source directory searched for a conventional entry
        source_path: PathBuf,
    },

    /// An entry pattern could not be compiled
    #[error("Invalid entry pattern '{pattern}': {reason}\n\nHint: Supported wildcards are *, **, ? and {{a,b}}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Config file doesn't exist at the expected location
    #[error("Config file not found: {}\n\nHint: Create a kiln.config.json file or specify --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// The bundler itself failed to run (as opposed to reporting diagnostics).
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// The bundler process could not be spawned
    #[error("Failed to start bundler `{command}`: {reason}\n\nHint: Check the `bundler.command` setting and that the bundler is installed")]
    SpawnFailed {
        /// Program that was invoked
        command: String,
        /// Underlying error
        reason: String,
    },

    /// The bundler produced output that is not a stats document
    #[error("Bundler output is not valid stats JSON: {0}\n\nHint: The bundler must support `--json` output")]
    InvalidStats(String),

    /// The build description could not be written
    #[error("Failed to write build description to {}: {reason}", .path.display())]
    DescriptionWriteFailed {
        /// Target path of the description file
        path: PathBuf,
        /// Underlying error
        reason: String,
    },

    /// Generic transport failure
    #[error("{0}")]
    Custom(String),
}

/// Manifest persistence errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// No stats.json on disk and nothing built in this process
    #[error("Manifest not found: {}\n\nHint: Run `kiln build` before serving", .0.display())]
    NotFound(PathBuf),

    /// stats.json exists but cannot be parsed
    #[error("Manifest at {} is malformed: {reason}", .path.display())]
    Malformed {
        /// Manifest path
        path: PathBuf,
        /// Parse error
        reason: String,
    },

    /// I/O failure while reading or writing
    #[error("Manifest I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The render contract rejected.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The render environment could not be prepared
    #[error("Render environment is not ready: {0}")]
    Prepare(String),

    /// The render process failed to run or exited abnormally
    #[error("Render failed for {url}: {reason}")]
    Failed {
        /// Requested URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// The renderer answered with something other than HTML or `false`
    #[error("Render returned an invalid response for {url}: {reason}")]
    InvalidResponse {
        /// Requested URL
        url: String,
        /// Parse failure
        reason: String,
    },

    /// The render call exceeded the configured timeout
    #[error("Render timed out for {url} after {timeout_ms}ms")]
    Timeout {
        /// Requested URL
        url: String,
        /// Configured timeout
        timeout_ms: u64,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Map a not-found I/O error to [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint line to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entries_message() {
        let err = ConfigError::NoEntries {
            patterns: 0,
            source_path: PathBuf::from("/app/src"),
        };
        let msg = err.to_string();
        assert!(msg.contains("No entries resolved"));
        assert!(msg.contains("/app/src"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_invalid_pattern_message_keeps_braces() {
        let err = ConfigError::InvalidPattern {
            pattern: "src/[".to_string(),
            reason: "unclosed".to_string(),
        };
        assert!(err.to_string().contains("{a,b}"));
    }

    #[test]
    fn test_spawn_failed_message() {
        let err = BuildError::SpawnFailed {
            command: "npx".to_string(),
            reason: "No such file or directory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to start bundler `npx`"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_manifest_not_found_message() {
        let err = ManifestError::NotFound(PathBuf::from("public/stats.json"));
        assert!(err.to_string().contains("public/stats.json"));
    }

    #[test]
    fn test_cli_error_from_domain_errors() {
        let cli: CliError = ConfigError::NotFound(PathBuf::from("kiln.config.json")).into();
        assert!(matches!(cli, CliError::Config(_)));

        let cli: CliError = BuildError::Custom("boom".into()).into();
        assert!(matches!(cli, CliError::Build(_)));

        let cli: CliError = RenderError::Timeout {
            url: "/".into(),
            timeout_ms: 10,
        }
        .into();
        assert!(matches!(cli, CliError::Render(_)));
    }

    #[test]
    fn test_result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/test/stats.json").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_result_ext_with_hint() {
        let result: std::result::Result<(), ConfigError> =
            Err(ConfigError::NotFound(PathBuf::from("kiln.config.json")));

        let err = result.with_hint("Try creating the file").unwrap_err();
        assert!(err.to_string().contains("Hint: Try creating the file"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), ManifestError> =
            Err(ManifestError::NotFound(PathBuf::from("stats.json")));

        let err = result.context("Failed to start gateway").unwrap_err();
        assert!(err.to_string().starts_with("Failed to start gateway: "));
    }
}

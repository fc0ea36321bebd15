//! Build results as reported by the bundler.

use crate::build::BuildTarget;
use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// One emitted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// A compile diagnostic (error or warning) reported by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawDiagnostic")]
pub struct ErrorDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            module_name: None,
            loc: None,
        }
    }

    /// `module:loc` when known.
    pub fn location(&self) -> Option<String> {
        match (&self.module_name, &self.loc) {
            (Some(module), Some(loc)) => Some(format!("{}:{}", module, loc)),
            (Some(module), None) => Some(module.clone()),
            _ => None,
        }
    }
}

/// Older bundlers report diagnostics as plain strings, newer ones as objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDiagnostic {
    Text(String),
    #[serde(rename_all = "camelCase")]
    Detail {
        message: String,
        #[serde(default)]
        module_name: Option<String>,
        #[serde(default)]
        loc: Option<String>,
    },
}

impl From<RawDiagnostic> for ErrorDetail {
    fn from(raw: RawDiagnostic) -> Self {
        match raw {
            RawDiagnostic::Text(message) => ErrorDetail::new(message),
            RawDiagnostic::Detail {
                message,
                module_name,
                loc,
            } => ErrorDetail {
                message,
                module_name,
                loc,
            },
        }
    }
}

/// Subset of the bundler's `--json` stats document that the pipeline reads.
#[derive(Debug, Deserialize)]
struct Stats {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    #[serde(default)]
    warnings: Vec<ErrorDetail>,
    #[serde(default)]
    assets: Vec<AssetInfo>,
    #[serde(default)]
    chunks: serde_json::Value,
}

/// Result of one build task.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub target: BuildTarget,
    pub errors: Vec<ErrorDetail>,
    pub warnings: Vec<ErrorDetail>,
    pub assets: Vec<AssetInfo>,
    /// Opaque chunk metadata, passed through to the manifest
    pub chunks: serde_json::Value,
    pub duration: Duration,
}

impl BuildOutcome {
    /// Outcome with no diagnostics and no assets.
    pub fn empty(target: BuildTarget) -> Self {
        Self {
            target,
            errors: Vec::new(),
            warnings: Vec::new(),
            assets: Vec::new(),
            chunks: serde_json::Value::Null,
            duration: Duration::ZERO,
        }
    }

    /// Parse bundler stdout.
    ///
    /// Bundlers often print progress lines before the JSON document, so
    /// parsing starts at the first `{` and ignores trailing output.
    pub fn from_stats(target: BuildTarget, output: &str) -> Result<Self, BuildError> {
        let start = output
            .find('{')
            .ok_or_else(|| BuildError::InvalidStats("no JSON object in output".to_string()))?;

        let stats: Stats = serde_json::Deserializer::from_str(&output[start..])
            .into_iter::<Stats>()
            .next()
            .ok_or_else(|| BuildError::InvalidStats("empty output".to_string()))?
            .map_err(|e| BuildError::InvalidStats(e.to_string()))?;

        Ok(Self {
            target,
            errors: stats.errors,
            warnings: stats.warnings,
            assets: stats.assets,
            chunks: stats.chunks,
            duration: Duration::ZERO,
        })
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Names of every emitted asset.
    pub fn asset_names(&self) -> BTreeSet<String> {
        self.assets.iter().map(|a| a.name.clone()).collect()
    }

    pub fn total_size(&self) -> u64 {
        self.assets.iter().map(|a| a.size).sum()
    }
}

/// What a build task hands back when it settles.
///
/// A transport error means the bundler could not be driven at all. It is
/// logged but never turns a build into a failure by itself; only
/// `outcome.errors` decide the exit status.
#[derive(Debug, Clone)]
pub struct BuildCompletion {
    pub transport_error: Option<BuildError>,
    pub outcome: BuildOutcome,
}

impl BuildCompletion {
    pub fn completed(outcome: BuildOutcome) -> Self {
        Self {
            transport_error: None,
            outcome,
        }
    }

    pub fn transport(target: BuildTarget, error: BuildError) -> Self {
        Self {
            transport_error: Some(error),
            outcome: BuildOutcome::empty(target),
        }
    }

    pub fn target(&self) -> BuildTarget {
        self.outcome.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stats_with_object_errors() {
        let output = r#"{
            "errors": [{"message": "Module not found", "moduleName": "./src/a.ts", "loc": "1:10"}],
            "warnings": [],
            "assets": [{"name": "bundle-index.js", "size": 1024, "emitted": true}],
            "chunks": [{"id": 0}]
        }"#;

        let outcome = BuildOutcome::from_stats(BuildTarget::Client, output).unwrap();
        assert!(outcome.has_errors());
        assert_eq!(outcome.errors[0].message, "Module not found");
        assert_eq!(outcome.errors[0].location().as_deref(), Some("./src/a.ts:1:10"));
        assert_eq!(outcome.assets[0].size, 1024);
        assert!(outcome.chunks.is_array());
    }

    #[test]
    fn test_parse_stats_with_string_errors() {
        let output = r#"{"errors": ["ERROR in ./src/index.tsx"], "assets": []}"#;
        let outcome = BuildOutcome::from_stats(BuildTarget::Server, output).unwrap();
        assert_eq!(outcome.errors, vec![ErrorDetail::new("ERROR in ./src/index.tsx")]);
        assert_eq!(outcome.target, BuildTarget::Server);
    }

    #[test]
    fn test_parse_stats_skips_leading_and_trailing_noise() {
        let output = "webpack 5.90.0 compiling...\n{\"assets\": [{\"name\": \"a.js\", \"size\": 1}]}\ndone\n";
        let outcome = BuildOutcome::from_stats(BuildTarget::Client, output).unwrap();
        assert!(outcome.success());
        assert_eq!(
            outcome.asset_names().into_iter().collect::<Vec<_>>(),
            vec!["a.js"]
        );
    }

    #[test]
    fn test_parse_stats_rejects_garbage() {
        assert!(matches!(
            BuildOutcome::from_stats(BuildTarget::Client, "command not found"),
            Err(BuildError::InvalidStats(_))
        ));
        assert!(BuildOutcome::from_stats(BuildTarget::Client, "{ broken").is_err());
    }

    #[test]
    fn test_transport_completion_has_clean_outcome() {
        let completion =
            BuildCompletion::transport(BuildTarget::Client, BuildError::Custom("gone".into()));
        assert!(completion.transport_error.is_some());
        assert!(completion.outcome.success());
        assert_eq!(completion.target(), BuildTarget::Client);
    }
}

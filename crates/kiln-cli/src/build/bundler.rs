//! Running build tasks.

use crate::build::{BuildCompletion, BuildDescription, BuildOutcome};
use crate::config::KilnConfig;
use crate::error::BuildError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Work directory for generated files, relative to `cwd`.
pub const WORK_DIR: &str = ".kiln";

/// Drives one build task to completion.
///
/// Implementations never fail: anything that prevents the bundler from
/// running is reported as a transport error inside the completion.
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn build(&self, description: &BuildDescription) -> BuildCompletion;
}

/// Runs an external bundler program.
///
/// The description is written to `<cwd>/.kiln/<target>.<mode>.json` and the
/// bundler is invoked as `<command> <args..> --config <file> --json`.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    command: String,
    args: Vec<String>,
    cwd: PathBuf,
    work_dir: PathBuf,
}

impl CommandBundler {
    pub fn new(command: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        Self {
            command: command.into(),
            args,
            work_dir: cwd.join(WORK_DIR),
            cwd,
        }
    }

    pub fn from_config(config: &KilnConfig) -> Self {
        Self::new(
            config.bundler.command.clone(),
            config.bundler.args.clone(),
            config.cwd.clone(),
        )
    }

    pub fn description_path(&self, description: &BuildDescription) -> PathBuf {
        self.work_dir.join(format!(
            "{}.{}.json",
            description.target,
            description.mode.as_str()
        ))
    }

    async fn write_description(&self, description: &BuildDescription) -> Result<PathBuf, BuildError> {
        let path = self.description_path(description);
        let write_failed = |e: &dyn std::fmt::Display| BuildError::DescriptionWriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        };

        let body = serde_json::to_vec_pretty(&description.body).map_err(|e| write_failed(&e))?;
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| write_failed(&e))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| write_failed(&e))?;

        Ok(path)
    }

    async fn run(&self, description: &BuildDescription) -> Result<BuildOutcome, BuildError> {
        let config_path = self.write_description(description).await?;

        tracing::debug!(
            "Running {} {} --config {} --json",
            self.command,
            self.args.join(" "),
            config_path.display()
        );

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg("--config")
            .arg(&config_path)
            .arg("--json")
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BuildError::SpawnFailed {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!(target: "kiln::bundler", "{}", line);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match BuildOutcome::from_stats(description.target, &stdout) {
            Ok(outcome) => Ok(outcome),
            // Bundlers exit non-zero on compile errors but still print stats;
            // without stats a failed exit is a transport problem
            Err(_) if !output.status.success() => Err(BuildError::Custom(format!(
                "Bundler exited with {}: {}",
                output.status,
                last_line(&stderr).unwrap_or("no output")
            ))),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn build(&self, description: &BuildDescription) -> BuildCompletion {
        let start = Instant::now();

        match self.run(description).await {
            Ok(outcome) => BuildCompletion::completed(outcome.with_duration(start.elapsed())),
            Err(error) => BuildCompletion::transport(description.target, error),
        }
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

//! Miette diagnostic conversion for CLI errors.

use crate::error::{BuildError, CliError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::Manifest(e) => miette::miette!("{}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::SpawnFailed { command, reason } => miette::miette!(
            help = "Check the `bundler.command` setting and that the bundler is installed",
            "Failed to start bundler `{}`: {}",
            command,
            reason
        ),
        BuildError::InvalidStats(reason) => miette::miette!(
            help = "The bundler must print its stats as JSON (webpack: --json)",
            "Bundler output is not valid stats JSON: {}",
            reason
        ),
        _ => miette::miette!("{}", err),
    }
}

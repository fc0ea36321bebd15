//! Command-line interface definition.
//!
//! - `kiln dev` - development server with live reload (optionally SSR)
//! - `kiln build` - one-shot production build (optionally SSR, then serve)
//! - `kiln serve` - SSR gateway over an existing build, or one-shot verification

mod commands;
mod validation;

use clap::{Args, Parser};
use std::path::PathBuf;

pub use commands::{BuildArgs, Command, DevArgs, ServeArgs, ServerArgs};
pub use validation::parse_url_path;

/// Kiln - build orchestration and server-side rendering for JavaScript applications
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Build orchestration and SSR gateway for JavaScript applications",
    long_about = "Kiln resolves entry points, drives an external bundler for client and\n\
                  server bundles, records the build manifest and serves the result\n\
                  through a live-reload dev server or a server-side rendering gateway."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the configuration file (default: ./kiln.config.json)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

//! Kiln - build orchestration and server-side rendering for JavaScript
//! applications.
//!
//! Kiln coordinates an external bundler and a Node.js render script; it
//! does not bundle or render itself. The pipeline:
//!
//! - [`entry`] - expand declarative entry patterns into an [`entry::EntryMap`]
//! - [`build`] - describe, run and judge client/server builds
//! - [`manifest`] - persist and share the build manifest (`stats.json`)
//! - [`dev`] - watch, rebuild and serve with live reload
//! - [`ssr`] - render pages per request, or defer to static serving
//!
//! Around it: [`config`], [`cli`], [`commands`], [`error`], [`logger`] and
//! [`ui`].
//!
//! # Example
//!
//! ```rust
//! use kiln_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod entry;
pub mod error;
pub mod logger;
pub mod manifest;
pub mod ssr;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};

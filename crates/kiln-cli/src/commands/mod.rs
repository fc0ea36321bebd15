//! Command implementations.
//!
//! - [`build`] - one-shot production build, optionally followed by serving
//! - [`dev`] - development server with live reload
//! - [`serve`] - SSR gateway over an existing build, or one-shot verification
//!
//! Each command returns the [`RunStatus`](crate::build::RunStatus) that
//! `main` turns into the exit code.

pub mod build;
pub mod dev;
pub mod serve;
pub mod utils;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
pub use serve::execute as serve_execute;

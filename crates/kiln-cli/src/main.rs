//! Kiln command-line entry point.
//!
//! Parses arguments, initializes logging and dispatches to a command. This
//! is the only place the process exit code is decided.

use clap::Parser;
use kiln_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.global.verbose, args.global.quiet, args.global.no_color);
    ui::init_colors(args.global.no_color);

    let global = args.global;
    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, &global).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args, &global).await,
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args, &global).await,
    };

    // Fatal errors render through miette and exit 1
    let status = result.map_err(error::cli_error_to_miette)?;
    if !status.is_success() {
        std::process::exit(status.code());
    }

    Ok(())
}

use clap::{builder::BoolishValueParser, Args, Subcommand};

use crate::cli::validation::parse_url_path;

/// Available Kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Builds the client bundle, watches the source tree and rebuilds on
    /// change. Connected browsers reload after each successful build.
    Dev(DevArgs),

    /// Build for production
    ///
    /// Builds the client bundle (and the server bundle with --ssr) once,
    /// writes the build manifest and exits non-zero on build errors.
    Build(BuildArgs),

    /// Serve an existing production build through the SSR gateway
    ///
    /// Pages are rendered per request by the compiled server bundle; URLs
    /// the renderer declines fall through to the static output directory.
    Serve(ServeArgs),
}

/// Bind address overrides shared by the serving commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Host to bind (overrides config)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,
}

/// Arguments for the dev command
#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    /// Render pages on the server
    ///
    /// The configured server entry renders each page request; the client
    /// bundle is still built and served with live reload.
    #[arg(long, env = "KILN_SSR", value_parser = BoolishValueParser::new())]
    pub ssr: bool,

    #[command(flatten)]
    pub server: ServerArgs,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Also build the server bundle
    #[arg(long, env = "KILN_SSR", value_parser = BoolishValueParser::new())]
    pub ssr: bool,

    /// Keep running and serve the build through the SSR gateway
    #[arg(long, requires = "ssr")]
    pub serve: bool,

    #[command(flatten)]
    pub server: ServerArgs,
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Render one URL and exit instead of serving
    ///
    /// Exits 0 when the page renders or the renderer declines it, 1 when
    /// rendering fails.
    #[arg(long, env = "KILN_TEST_SSR", value_parser = BoolishValueParser::new())]
    pub verify: bool,

    /// URL rendered by --verify (default: ssr.verifyUrl from config)
    #[arg(long, value_name = "URL", requires = "verify", value_parser = parse_url_path)]
    pub verify_url: Option<String>,

    #[command(flatten)]
    pub server: ServerArgs,
}

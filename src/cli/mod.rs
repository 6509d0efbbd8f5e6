use std::{env, io::IsTerminal};

use clap::Parser;
use clap_verbosity_flag::Verbosity;
use miette::IntoDiagnostic;
use tracing_subscriber::{
    filter::LevelFilter, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
    EnvFilter,
};

pub mod download;
pub mod tool;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "
Fad - fast download and extraction of GitHub Actions artifacts.

Fad fetches the artifact archive through the GitHub REST API, follows the
single redirect to the signed blob URL by hand, and streams the zip into a
destination directory, either via the external ripunzip utility or an
in-process unzip path.

Basic Usage:
    $ fad download --artifact-id 42 --owner acme --repo widgets --path ./out

Found a Bug or Have a Feature Request?
Open an issue at: https://github.com/fad-dev/fad/issues
"
)]
#[clap(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// The verbosity level
    /// (-v for warning, -vv for info, -vvv for debug, -vvvv for trace, -q for
    /// quiet)
    #[command(flatten)]
    verbose: Verbosity,

    /// Whether the log needs to be colored.
    #[clap(long, default_value = "auto", global = true, env = "FAD_COLOR")]
    color: ColorOutput,
}

#[derive(Parser, Debug)]
pub enum Command {
    /// Download and extract a workflow artifact
    #[clap(visible_alias = "d")]
    Download(download::Args),

    /// Manage the cached extraction utility
    Tool(tool::Args),
}

pub async fn execute() -> miette::Result<()> {
    let args = Args::parse();
    let use_colors = use_color_output(&args);

    // Set up the default miette handler based on whether we want colors or not.
    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::default()
                .color(use_colors)
                .build(),
        )
    }))?;

    // Honor FORCE_COLOR and NO_COLOR environment variables.
    // Those take precedence over the CLI flag and FAD_COLOR
    let use_colors = match env::var("FORCE_COLOR") {
        Ok(_) => true,
        Err(_) => match env::var("NO_COLOR") {
            Ok(_) => false,
            Err(_) => use_colors,
        },
    };

    console::set_colors_enabled(use_colors);
    console::set_colors_enabled_stderr(use_colors);

    let (level_filter, fad_level) = tracing_levels(args.verbose.log_level_filter());

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env()
        .into_diagnostic()?
        .add_directive(format!("fad={}", fad_level).parse().into_diagnostic()?);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(use_colors)
        .with_writer(std::io::stderr)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    // Execute the command
    execute_command(args.command).await
}

/// Execute the actual command
pub async fn execute_command(command: Command) -> miette::Result<()> {
    match command {
        Command::Download(cmd) => download::execute(cmd).await,
        Command::Tool(cmd) => tool::execute(cmd).await,
    }
}

/// Map the CLI verbosity onto the default tracing level and the level used
/// for our own crates.
fn tracing_levels(
    verbosity: clap_verbosity_flag::log::LevelFilter,
) -> (LevelFilter, LevelFilter) {
    match verbosity {
        clap_verbosity_flag::log::LevelFilter::Off => (LevelFilter::OFF, LevelFilter::OFF),
        clap_verbosity_flag::log::LevelFilter::Error => (LevelFilter::ERROR, LevelFilter::WARN),
        clap_verbosity_flag::log::LevelFilter::Warn => (LevelFilter::WARN, LevelFilter::INFO),
        clap_verbosity_flag::log::LevelFilter::Info => (LevelFilter::INFO, LevelFilter::INFO),
        clap_verbosity_flag::log::LevelFilter::Debug => (LevelFilter::DEBUG, LevelFilter::DEBUG),
        clap_verbosity_flag::log::LevelFilter::Trace => (LevelFilter::TRACE, LevelFilter::TRACE),
    }
}

/// Whether to use colored log format.
/// Option `Auto` enables color output only if the logging is done to a terminal
/// and  `NO_COLOR` environment variable is not set.
#[derive(clap::ValueEnum, Debug, Clone, Default)]
pub enum ColorOutput {
    Always,
    Never,

    #[default]
    Auto,
}

/// Returns true if the output is considered to be a terminal.
fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Returns true if the log outputs should be colored or not.
fn use_color_output(args: &Args) -> bool {
    match args.color {
        ColorOutput::Always => true,
        ColorOutput::Never => false,
        ColorOutput::Auto => std::env::var_os("NO_COLOR").is_none() && is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_levels_cover_every_verbosity() {
        // The default `-q`..`-vvvv` range maps onto progressively noisier
        // tracing filters, with our own crates one step louder in the middle.
        use clap_verbosity_flag::log::LevelFilter as V;

        assert_eq!(tracing_levels(V::Off), (LevelFilter::OFF, LevelFilter::OFF));
        assert_eq!(
            tracing_levels(V::Error),
            (LevelFilter::ERROR, LevelFilter::WARN)
        );
        assert_eq!(
            tracing_levels(V::Warn),
            (LevelFilter::WARN, LevelFilter::INFO)
        );
        assert_eq!(
            tracing_levels(V::Info),
            (LevelFilter::INFO, LevelFilter::INFO)
        );
        assert_eq!(
            tracing_levels(V::Trace),
            (LevelFilter::TRACE, LevelFilter::TRACE)
        );
    }
}

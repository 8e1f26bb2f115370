//! # Commands
//!
//! - `git-slice run` - Select commits and analyse each one in a container
//! - `git-slice select` - Show which commits a configuration selects

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;
mod executor;
mod git;
mod ui;
mod workspace;

use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use console::style;
pub use slice_core::CONFIG_FILENAME;
use tracing_subscriber::filter::LevelFilter;

use crate::ui::colors;

const REPO_URL: &str = "https://github.com/spikermint/git-slice";

#[derive(Debug, Parser)]
#[command(
    name = "git-slice",
    version,
    styles = ui::clap_styles(),
    arg_required_else_help = true,
)]
struct Cli {
    /// Logging level used when `RUST_LOG` is not set.
    #[arg(short, long, global = true, value_enum, default_value_t)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Select commits and analyse each one in a container
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Show which commits a configuration selects
    #[command(visible_alias = "s")]
    Select(SelectArgs),
}

/// Logging verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warn,
    /// Progress messages.
    #[default]
    Info,
    /// Gate decisions and commands being run.
    Debug,
    /// Everything, including container output lines.
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// Output format for selection results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Arguments for the `git-slice run` command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Path to the `git-slice.toml` configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Select commits and report what would run, without running anything.
    #[arg(short, long)]
    pub dry_run: bool,

    /// Number of analyses to run in parallel.
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Arguments for the `git-slice select` command.
#[derive(Debug, Parser)]
pub struct SelectArgs {
    /// Path to the `git-slice.toml` configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Repository to select from, instead of the configured source.
    #[arg(short, long, default_value = ".")]
    pub repo: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn main() {
    let cli = parse_cli();

    init_tracing(cli.log_level);

    if let Err(e) = run(cli.command) {
        ui::print_error(&format!("{e:#}"));
        std::process::exit(ui::exit::ERROR);
    }
}

fn init_tracing(level: LogLevel) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn parse_cli() -> Cli {
    let cmd = Cli::command().about(build_about()).after_help(build_after_help());

    let matches = cmd.get_matches();

    #[expect(clippy::expect_used, reason = "clap already validated args; this cannot fail")]
    Cli::from_arg_matches(&matches).expect("failed to parse arguments")
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run(args) => commands::run::run(&args),
        Command::Select(args) => commands::select::run(&args),
    }
}

fn build_about() -> String {
    format!(
        r"
  {} selects commits from a repository's history and runs a
  containerised analysis on each one in parallel.",
        colors::accent().apply_to("git-slice").bold()
    )
}

fn build_after_help() -> String {
    format!(
        r"
  {}
    git-slice run                      Analyse commits using git-slice.toml
    git-slice run --dry-run            Show what would be analysed
    git-slice run -c slice.toml -w 8   Custom config, eight workers
    git-slice select --format json     Print selected commits as JSON

  Learn more: {}",
        style("Examples:").bold(),
        colors::accent().apply_to(REPO_URL).underlined()
    )
}

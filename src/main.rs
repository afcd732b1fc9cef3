mod cargo;
mod commands;
mod core;
mod host;
mod release;
mod ui;

use clap::{Parser, Subcommand};
use commands::ReleaseOptions;
use core::error::{ShipError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter (e.g. `cargo_ship=debug`)
const LOG_ENV: &str = "SHIP_LOG";

/// Build, package and publish release binaries for every target
#[derive(Parser)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
#[command(styles = get_styles())]
enum CargoCli {
  Ship(ShipCli),
}

#[derive(Parser)]
#[command(name = "ship")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct ShipCli {
  /// Log pipeline activity to stderr (repeat for more detail)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Publish a release for a tag ref and attach a build for every target
  Release {
    /// Triggering ref, e.g. refs/tags/v1.2.3 (default: $GITHUB_REF)
    reference: Option<String>,
    /// Source checkout to build (default: current directory)
    #[arg(long)]
    source: Option<PathBuf>,
    /// Only build these target triples
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,
    /// Skip targets this host cannot build
    #[arg(long)]
    local_only: bool,
    /// Re-run only the targets that failed in a previous summary file
    #[arg(long, value_name = "SUMMARY")]
    retry_failed: Option<PathBuf>,
    /// Replace assets that already exist on the release
    #[arg(long)]
    overwrite: bool,
    /// Per-target compile timeout in seconds
    #[arg(long, value_name = "SECS")]
    build_timeout: Option<u64>,
    /// Per-asset upload timeout in seconds
    #[arg(long, value_name = "SECS")]
    upload_timeout: Option<u64>,
    /// Maximum number of concurrent target pipelines (0 = one per target)
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Run `git submodule update --init --recursive` before building
    #[arg(long)]
    sync_submodules: bool,
    /// Show the plan without creating a release or building
    #[arg(long)]
    dry_run: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
    /// Write the run summary to this file
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
  },

  /// List the registered build targets
  Targets {
    /// Source checkout (default: current directory)
    #[arg(long)]
    source: Option<PathBuf>,
    /// Output targets in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the version a ref resolves to
  Resolve {
    /// Ref to resolve (default: $GITHUB_REF)
    reference: Option<String>,
  },

  /// Write a ship.toml with the default settings
  Init {
    /// Source checkout (default: current directory)
    #[arg(long)]
    source: Option<PathBuf>,
    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  let yellow = anstyle::Color::Ansi(anstyle::AnsiColor::Yellow);
  let green = anstyle::Color::Ansi(anstyle::AnsiColor::Green);
  let red = anstyle::Color::Ansi(anstyle::AnsiColor::Red);

  clap::builder::Styles::styled()
    .usage(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .header(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .literal(anstyle::Style::new().fg_color(Some(green)))
    .invalid(anstyle::Style::new().bold().fg_color(Some(red)))
    .error(anstyle::Style::new().bold().fg_color(Some(red)))
    .valid(anstyle::Style::new().bold().underline().fg_color(Some(green)))
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_logging(verbose: u8) {
  let filter = match std::env::var(LOG_ENV) {
    Ok(spec) => EnvFilter::new(spec),
    Err(_) => EnvFilter::new(match verbose {
      0 => "warn",
      1 => "cargo_ship=info",
      _ => "cargo_ship=debug",
    }),
  };

  // Stdout carries command output (and --json), so logs go to stderr
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

fn current_dir_or(source: Option<PathBuf>) -> Result<PathBuf, ShipError> {
  match source {
    Some(dir) => Ok(dir),
    None => Ok(std::env::current_dir()?),
  }
}

fn main() {
  let CargoCli::Ship(cli) = CargoCli::parse();
  init_logging(cli.verbose);

  let result = match cli.command {
    Commands::Release {
      reference,
      source,
      only,
      local_only,
      retry_failed,
      overwrite,
      build_timeout,
      upload_timeout,
      jobs,
      sync_submodules,
      dry_run,
      json,
      summary,
    } => commands::run_release(ReleaseOptions {
      reference,
      source,
      only,
      local_only,
      retry_failed,
      overwrite,
      build_timeout,
      upload_timeout,
      jobs,
      sync_submodules,
      dry_run,
      json,
      summary,
    }),
    Commands::Targets { source, json } => current_dir_or(source).and_then(|dir| commands::run_targets(&dir, json)),
    Commands::Resolve { reference } => commands::run_resolve(reference),
    Commands::Init { source, force } => current_dir_or(source).and_then(|dir| commands::run_init(&dir, force)),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ShipError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

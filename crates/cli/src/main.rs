use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use cmd::ProjectArgs;
use output::OutputFormat;

/// Isengard - incremental build engine
#[derive(Parser)]
#[command(name = "isg")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  #[command(flatten)]
  project: ProjectArgs,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Bring a target up to date
  Run {
    /// Target to build
    target: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Remove the artifacts produced on the way to a target
  Clean {
    /// Target whose producing rules are cleaned
    target: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// List rule outputs and the rules producing them
  Targets {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn init_logging(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match cli.command {
    Commands::Run { target, output } => cmd::cmd_run(&cli.project, &target, output),
    Commands::Clean { target, output } => cmd::cmd_clean(&cli.project, &target, output),
    Commands::Targets { output } => cmd::cmd_targets(&cli.project, output),
  }
}

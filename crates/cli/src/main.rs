mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{InfoArgs, PlanArgs, RunArgs};

/// distpipe - build and release pipeline for native projects
#[derive(Parser)]
#[command(name = "distpipe")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Provision the toolchain, build the project and package the release archive
  Run(RunArgs),

  /// Show what a run would do without executing anything
  Plan(PlanArgs),

  /// Show the detected host and CI environment
  Info(InfoArgs),
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Run(args) => cmd::cmd_run(args),
    Commands::Plan(args) => cmd::cmd_plan(args).map(|()| ExitCode::SUCCESS),
    Commands::Info(args) => cmd::cmd_info(args).map(|()| ExitCode::SUCCESS),
  };

  match result {
    Ok(code) => code,
    Err(err) => {
      output::status(output::Status::Failed, format_args!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}

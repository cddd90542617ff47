//! Implementation of the `distpipe run` command.
//!
//! Resolves the context, then runs provisioning, build and packaging in order. A pipeline
//! failure is reported with its stage and mapped to the stage's exit code.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use distpipe_lib::exec::ProcessRunner;
use distpipe_lib::pipeline::{Cancellation, Pipeline, PipelineError, PipelineReport};

use super::ContextArgs;
use crate::output::{self, OutputFormat, Status, format_elapsed, format_size, print_json};

#[derive(Debug, Args)]
pub struct RunArgs {
  #[command(flatten)]
  context: ContextArgs,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

pub fn cmd_run(args: RunArgs) -> Result<ExitCode> {
  let (ctx, source, config) = args.context.resolve()?;
  let runner = ProcessRunner::new(config.timeout().context("Invalid timeout")?);

  info!(os = %ctx.target_os(), source = %source, "target resolved");

  let cancel = Cancellation::new();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  let result = rt.block_on(async {
    let handle = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, stopping after the current stage");
        handle.cancel();
      }
    });

    let mut pipeline = Pipeline::new(&ctx, &config, &runner).with_cancellation(cancel.clone());
    pipeline.run().await
  });

  match result {
    Ok(report) => {
      if args.output.is_json() {
        print_json(&report)?;
      } else {
        print_report(&report);
      }
      Ok(ExitCode::SUCCESS)
    }
    Err(err) => {
      report_failure(&err, args.output)?;
      Ok(ExitCode::from(err.exit_code()))
    }
  }
}

fn print_report(report: &PipelineReport) {
  output::status(Status::Done, format_args!("Created {}", report.artifact.file_name));
  output::field("Path", report.artifact.path.display());
  output::field("Size", format_size(report.artifact.size));
  output::field("SHA-256", &report.artifact.sha256);
  output::field("Target", report.context.target_os());
  if let Some(tag) = report.context.version_tag() {
    output::field("Tag", tag);
  }
  output::field("Elapsed", format_elapsed(Duration::from_millis(report.elapsed_ms)));

  output::heading("Toolchain");
  for (tool, version) in &report.toolchain {
    output::field(tool, version);
  }
}

fn report_failure(err: &PipelineError, format: OutputFormat) -> Result<()> {
  if format.is_json() {
    print_json(&serde_json::json!({
      "error": err.to_string(),
      "stage": err.stage().map(|s| s.to_string()),
      "exit_code": err.exit_code(),
    }))?;
  }

  output::stage_failed(err.stage(), err);
  Ok(())
}

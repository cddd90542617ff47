//! Implementation of the `distpipe plan` command.
//!
//! Resolves the context and configuration and prints what `run` would do. Nothing is
//! executed and nothing is written.

use anyhow::{Context, Result};
use clap::Args;

use distpipe_lib::pipeline::PipelinePlan;

use super::ContextArgs;
use crate::output::{self, OutputFormat, Status, format_elapsed, print_json};

#[derive(Debug, Args)]
pub struct PlanArgs {
  #[command(flatten)]
  context: ContextArgs,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

pub fn cmd_plan(args: PlanArgs) -> Result<()> {
  let (ctx, source, config) = args.context.resolve()?;
  let plan = PipelinePlan::resolve(&ctx, &config).context("Invalid configuration")?;

  if args.output.is_json() {
    return print_json(&plan);
  }

  output::status(Status::Note, format_args!("Plan for {}", plan.project));
  output::field("Target", format_args!("{} (from {})", ctx.target_os(), source));
  output::field("Tag", ctx.version_tag().unwrap_or("(none)"));
  output::field("Working directory", ctx.working_directory().display());
  if let Some(timeout) = plan.timeout {
    output::field("Command timeout", format_elapsed(timeout));
  }

  output::heading("Toolchain");
  for req in &plan.requirements {
    match &req.package {
      Some(package) => output::item(format_args!("{} ({}, package {})", req.name, req.probe, package)),
      None => output::item(format_args!("{} ({})", req.name, req.probe)),
    }
  }

  output::heading("Build");
  output::mapping(&plan.build_command, plan.binary_path.display());

  output::heading("Package");
  for entry in &plan.manifest.entries {
    output::mapping(
      entry.source.display(),
      format_args!("{}/{}", plan.manifest.root_name(), entry.dest.display()),
    );
  }
  output::field("Archive", plan.archive_path.display());

  Ok(())
}
